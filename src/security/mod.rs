pub mod validation;

pub use validation::{
    validate_email, validate_positive, validate_required, validate_uuid, ValidationError,
};
