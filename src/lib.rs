//! A static resource linter for iOS-style application bundles.
//!
//! Given an unarchived `.xcodeproj` and a chosen target/configuration, this
//! crate determines which bundle resources ship, which are referenced by
//! source text through an expression-signature DSL, which resources go
//! unreferenced, and which references are broken — with fuzzy-match
//! suggestions for the likely typo.
//!
//! The pipeline is: [`plist`] decodes the project file's OpenStep text into
//! a [`plist::Value`] tree, [`unarchiver`] turns that into a [`model::ProjectModel`],
//! and [`linter::Linter`] drives the [`directive`]/[`signature`]/[`regex_facade`]
//! machinery over the target's source files, resolving hits through
//! [`resolver`] against the model's bundle index.

pub mod directive;
pub mod error;
pub mod linter;
pub mod location;
pub mod model;
pub mod plist;
pub mod regex_facade;
pub mod resolver;
pub mod signature;
pub mod strutil;
pub mod unarchiver;
pub mod xcconfig;

pub use error::{ConfigError, RespectResult, StructuralError};
pub use linter::{Linter, LinterSource};
pub use model::ProjectModel;
