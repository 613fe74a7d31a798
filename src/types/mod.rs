pub mod ef_cardaccess;
pub mod errors;
pub mod mrz;
pub mod parsed_data_groups;

pub use self::ef_cardaccess::*;
pub use self::errors::*;
pub use self::mrz::*;
pub use self::parsed_data_groups::*;
