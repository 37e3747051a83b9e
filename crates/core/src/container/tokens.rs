//! Service tokens for trait-object injection
//!
//! A token is a zero-sized type naming a service by its interface rather than
//! its implementation. The container stores token services as
//! `Arc<Token::Service>` under [`ServiceToken::key`], so consumers resolve
//! `Arc<dyn Trait>` without knowing the concrete type.
//!
//! ```rust
//! use dactyl_core::container::{Container, ServiceScope, ServiceToken};
//! use std::sync::Arc;
//!
//! trait Mailer: Send + Sync {
//!     fn provider(&self) -> &str;
//! }
//!
//! struct SmtpMailer;
//! impl Mailer for SmtpMailer {
//!     fn provider(&self) -> &str {
//!         "smtp"
//!     }
//! }
//!
//! struct MailerToken;
//! impl ServiceToken for MailerToken {
//!     type Service = dyn Mailer;
//! }
//!
//! let mut container = Container::new();
//! container
//!     .register_token::<MailerToken, _>(ServiceScope::Singleton, vec![], |_| {
//!         Ok(Arc::new(SmtpMailer) as Arc<dyn Mailer>)
//!     })
//!     .unwrap();
//!
//! let mailer = container.resolve_token::<MailerToken>().unwrap().unwrap();
//! assert_eq!(mailer.provider(), "smtp");
//! ```

use crate::container::descriptor::ServiceKey;

/// Compile-time identifier for a service interface
pub trait ServiceToken: Send + Sync + 'static {
    /// The service type this token represents, typically `dyn Trait`
    type Service: ?Sized + Send + Sync + 'static;

    /// Registration key, defaults to the token's declared name
    fn key() -> ServiceKey {
        ServiceKey::of::<Self>()
    }

    /// Get the type name of the service, for diagnostics
    fn service_type_name() -> &'static str {
        std::any::type_name::<Self::Service>()
    }
}
