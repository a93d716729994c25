pub mod books;

use bookshelf_kernel::{settings::Settings, ModuleRegistry};

/// Register all project-specific modules with the registry
pub async fn register_all(registry: &mut ModuleRegistry, settings: &Settings) {
    registry.register(books::create_module(settings).await);
}
