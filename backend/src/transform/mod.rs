//! Transformation module.
//!
//! Operator input to bundle-ready data:
//! - Roles: role map checks
//! - Normalizer: question rows to records and the review view
//! - Images / Display: inline thumbnails and HTML rendering
//! - Credentials / Fields: the two login modes
//! - Pipeline: the wizard tying every step together

pub mod credentials;
pub mod display;
pub mod fields;
pub mod images;
pub mod normalizer;
pub mod pipeline;
pub mod roles;

pub use credentials::{select_credentials, CredentialSelection, CredentialsTable, RenameDraft};
pub use display::render_html;
pub use fields::{collect_field_definitions, FieldCollection};
pub use normalizer::{normalize, normalize_table, split_options, NormalizeOutcome};
pub use pipeline::{run_wizard, LoginSection, QuestionsSection, WizardManifest, WizardReport};
pub use roles::validate_role_map;
