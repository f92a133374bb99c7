pub mod urls;

pub use urls::router;
