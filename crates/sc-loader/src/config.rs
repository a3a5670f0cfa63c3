use sc_core::ModuleId;

/// Identifier of the module every game implicitly uses.
pub const CORE_MODULE_ID: &str = "53D8F89C-4EDC-4DEF-B464-015BD1187E95";

/// File name that marks a module definition during discovery.
pub const MODULE_FILE_NAME: &str = "module.bgm";

/// Configuration for document loading and module discovery.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Module appended to every game's used-module set.
    pub core_module_id: ModuleId,
    /// File name searched for when discovering modules.
    pub module_file_name: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            core_module_id: ModuleId::from(CORE_MODULE_ID),
            module_file_name: MODULE_FILE_NAME.to_string(),
        }
    }
}

impl LoadConfig {
    /// Set the core module id.
    pub fn with_core_module_id(mut self, id: impl Into<ModuleId>) -> Self {
        self.core_module_id = id.into();
        self
    }

    /// Set the module definition file name.
    pub fn with_module_file_name(mut self, name: impl Into<String>) -> Self {
        self.module_file_name = name.into();
        self
    }
}
