pub mod image;
pub mod launcher;

pub use launcher::SandboxLauncher;
