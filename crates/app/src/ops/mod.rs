pub mod init;
pub mod inspect;
pub mod publish;
pub mod version;

pub use init::Init;
pub use inspect::Inspect;
pub use publish::Publish;
pub use version::Version;
