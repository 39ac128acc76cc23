//! Promptwire driver: automates an already-authenticated, browser-rendered
//! chat UI over the Chrome DevTools Protocol.
//!
//! ```text
//! ┌──────────────┐   bus (correlated)   ┌──────────────────┐    CDP     ┌─────────────┐
//! │ PromptDriver │ ◄──────────────────► │   Orchestrator   │ ◄────────► │ Chat UI tab │
//! │   (facade)   │                      │ broker/detector  │  WebSocket │  (Chrome)   │
//! └──────────────┘                      └──────────────────┘            └─────────────┘
//! ```
//!
//! ## Setup
//!
//! Start Chrome with remote debugging enabled and log into the chat site:
//!
//! ```bash
//! google-chrome --remote-debugging-port=9222
//! ```
//!
//! The driver only manipulates the already-loaded page: it injects the
//! prompt into the site's editor (structured editor API first, raw DOM
//! writes second), submits it, and watches the streamed answer until it
//! stabilizes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let driver = PromptDriver::connect(DriverConfig::default()).await?;
//! driver.initialize();
//! if driver.is_available().await {
//!     let answer = driver.send_prompt("What is Rust?", SendOptions::default()).await?;
//!     println!("{answer}");
//! }
//! ```

pub mod broker;
pub mod bus;
pub mod cdp;
pub mod config;
pub mod detector;
pub mod facade;
pub mod host;
mod inject;
pub mod locator;
pub mod orchestrator;

pub use broker::PageBroker;
pub use bus::{message_bus, FacadeSide, PromptSubmission, WorkerSide};
pub use cdp::{CdpClient, CdpError, PageSession};
pub use config::{ConfigError, DriverConfig, SiteProfile};
pub use detector::{CompletionDetector, DetectorOutcome, DetectorState, TickSignals, TIMEOUT_SENTINEL};
pub use facade::{ProgressStage, PromptDriver, SendOptions};
pub use host::{CdpPageAttacher, PageAttacher, ScriptHost};
pub use locator::{CdpTargetLocator, TargetLocator};
pub use orchestrator::Orchestrator;
