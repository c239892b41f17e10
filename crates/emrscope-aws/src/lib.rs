// emrscope-aws: EMR and Glue resource domains over the AWS SDK.

pub mod domains;
pub mod error;
pub mod session;

pub use domains::{EmrOnEc2, EmrOnEks, EmrServerless, GlueCatalog, default_domains};
pub use error::Error;
pub use session::{AwsSession, SessionOptions};

// Static credentials for `SessionOptions`.
pub use aws_credential_types::Credentials;
