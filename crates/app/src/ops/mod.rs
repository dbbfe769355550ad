pub mod batch;
pub mod derive;
pub mod init;
pub mod show;
pub mod version;

pub use batch::Batch;
pub use derive::Derive;
pub use init::Init;
pub use show::Show;
pub use version::Version;
