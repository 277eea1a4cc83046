//! Application state shared by the HTTP handlers

use mydas_commands::CommandManager;
use mydas_core::GlobalConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<CommandManager>,
}

impl AppState {
    pub fn new(manager: Arc<CommandManager>) -> Self {
        Self { manager }
    }

    pub fn global(&self) -> &GlobalConfig {
        self.manager.global()
    }
}
