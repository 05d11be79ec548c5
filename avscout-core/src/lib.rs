//! Domain types for avscout: catalog identities, scanned movies, and the
//! metadata record that data sources fill in.

pub mod error;
pub mod identity;
pub mod movie;
pub mod record;
pub mod slices;
pub mod util;

pub use error::{IdentityError, RecordError};
pub use identity::{
    CASCADE_VERSION, Classification, Identity, IdentityParser, classify, is_uncensored,
    resolve_content_id,
};
pub use movie::{DiscoveredFile, Movie};
pub use record::{Field, FieldKind, FieldValue, MetadataRecord};
pub use slices::{SliceError, SliceOrder, order_slices};
