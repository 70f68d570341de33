//! # browser-a11y
//!
//! Accessibility checkers that run against a live document: each checker
//! annotates the elements it judges in place, keeps its annotations current
//! while the page changes, and leaves no trace after cleanup.
//!
//! ## Features
//!
//! - **Rule contract**: one [`Checker`] per rule with an idempotent `apply` / `cleanup` lifecycle
//! - **Exact restoration**: every touched style is snapshotted and restored; every inserted node is removed
//! - **Revalidation**: active checkers rebuild when matching elements come or go, the root's theme attributes change, or the color scheme flips
//! - **Structured diagnostics**: [`AccessibilityIssue`] records with stable ids, evidence, impact and fixes, plus a JSON schema
//! - **Built-in rules**: heading order, link label consistency, interactive cursor, keyboard reachability, language tags
//!
//! ## Usage
//!
//! ```rust
//! use browser_a11y::{AuditConfig, AuditSession, Document};
//!
//! # fn main() -> browser_a11y::Result<()> {
//! let document = Document::from_html("<html lang=\"en\"><body><h2>Intro</h2></body></html>");
//! let mut session = AuditSession::new(document, AuditConfig::default())?;
//!
//! let outcome = session.select("heading-order")?;
//! assert!(outcome.success);
//! assert_eq!(session.issues()[0].evidence.expected.as_deref(), Some("h1"));
//!
//! // The page changes; deliver the notifications like a host event loop would
//! let body = session.document().body().unwrap();
//! let h1 = session.document_mut().create_element("h1");
//! session.document_mut().append_child(body, h1)?;
//! session.dispatch()?;
//!
//! session.deselect("heading-order")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Writing a rule
//!
//! Implement [`Rule`] and wrap it in a [`Checker`]:
//!
//! ```rust
//! use browser_a11y::audit::{Checker, FixSuggestion, Impact, Rule, Severity, Validation};
//! use browser_a11y::{AuditConfig, Document, NodeId};
//!
//! struct ImageAlt;
//!
//! impl Rule for ImageAlt {
//!     fn id(&self) -> &'static str { "image-alt" }
//!     fn name(&self) -> &'static str { "Image alternative text" }
//!     fn category(&self) -> &'static str { "images" }
//!     fn selector(&self) -> &str { "img" }
//!
//!     fn validate_element(&self, doc: &Document, el: NodeId, _all: &[NodeId]) -> Validation {
//!         if doc.has_attribute(el, "alt") {
//!             Validation::valid()
//!         } else {
//!             Validation::invalid(Severity::High, "Image has no alt attribute")
//!         }
//!     }
//!
//!     fn impact(&self) -> Impact { Impact::screen_reader() }
//!
//!     fn fix(&self, _doc: &Document, _el: NodeId, _outcome: &Validation) -> FixSuggestion {
//!         FixSuggestion::new("Describe the image in an alt attribute")
//!     }
//! }
//!
//! let mut doc = Document::from_html(r#"<img src="cat.png">"#);
//! let mut checker = Checker::new(ImageAlt, AuditConfig::default());
//! assert_eq!(checker.apply(&mut doc).issues.map(|i| i.len()), Some(1));
//! checker.cleanup(&mut doc);
//! ```
//!
//! ## Module Overview
//!
//! - [`audit`]: rule contract, checker lifecycle, snapshots, revalidation, diagnostic records
//! - [`rules`]: built-in rules
//! - [`dom`]: the live document model the checkers run against
//! - [`session`]: checker registry with one-active-per-category selection
//! - [`config`]: annotation colors and session options
//! - [`error`]: Error types and result aliases
//! - `browser`: capture live pages from Chrome (requires the `chrome` feature)

pub mod audit;
pub mod config;
pub mod dom;
pub mod error;
pub mod rules;
pub mod session;

#[cfg(feature = "chrome")]
pub mod browser;

pub use audit::{AccessibilityIssue, Checker, DynChecker, Rule, RunMode, RunOutcome, Severity, Validation};
pub use config::AuditConfig;
pub use dom::{Document, ElementNode, NodeId, Selector};
pub use error::{AuditError, Result};
pub use session::AuditSession;

#[cfg(feature = "chrome")]
pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
