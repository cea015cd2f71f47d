//! Renames downloaded programme files into `Show - sNNeNN - Episode.ext` form
//! using the programme identifier embedded in each filename.

pub mod identifier;
pub mod metadata;
pub mod naming;
pub mod normalize;
pub mod rename_engine;

pub use identifier::{IdentifierExtractor, ProgrammeId};
pub use metadata::{HttpResolver, MetadataResolver, ProgrammeMetadata, ResolveError};
pub use naming::{synthesize, TargetLocation};
pub use rename_engine::{ConfigBuilder, ConversionOutcome, ConversionReport, RenameConfig, RenameEngine};
