//! # touchkit-core
//!
//! Element resolution and touch gesture synthesis for remote UI automation.
//!
//! A command such as "tap the button labelled Submit" or "drag from A to B at
//! 800 points per second" is turned into a concrete, timed sequence of touch
//! events and handed to an injection backend. The element tree and the touch
//! delivery mechanism are collaborators behind traits; this crate owns the
//! semantics in between.
//!
//! ## Modules
//!
//! - [`geometry`] - Points, rectangles, interpolation and gesture pacing
//! - [`element`] - Accessibility hierarchy snapshot types
//! - [`query`] - Element queries, glob and predicate matching
//! - [`provider`] - The [`ElementProvider`](provider::ElementProvider) seam and an in-memory tree provider
//! - [`resolver`] - Resolves a query to exactly one tap target
//! - [`gesture`] - Synthesizes timed touch event sequences
//! - [`injector`] - The [`TouchInjector`](injector::TouchInjector) seam and a real-time scheduler
//! - [`dispatcher`] - The public command contract (`drag`, `findAndTap`, `tapCoordinate`)
//! - [`command`] - Remote command surface, results and logs
//! - [`config`] - Persistent configuration in `~/.touchkit/config.json`
//! - [`error`] - Error taxonomy
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use touchkit_core::application::Application;
//! use touchkit_core::dispatcher::CommandDispatcher;
//! use touchkit_core::provider::TreeProvider;
//! use touchkit_core::query::Query;
//! use touchkit_core::resolver::Narrowing;
//! # use touchkit_core::injector::TouchInjector;
//!
//! # async fn run(injector: Arc<dyn TouchInjector>) {
//! let tree = std::fs::read_to_string("hierarchy.json").unwrap();
//! let provider = Arc::new(TreeProvider::from_json(&tree).unwrap());
//! let app = Application::new("com.example.app");
//! let dispatcher = CommandDispatcher::new(provider, injector, app.clone());
//!
//! let result = dispatcher
//!     .find_and_tap(&app, &Query::name("Submit"), Narrowing::ButtonLike)
//!     .await;
//! # }
//! ```

pub mod application;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod element;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod injector;
pub mod provider;
pub mod query;
pub mod resolver;
