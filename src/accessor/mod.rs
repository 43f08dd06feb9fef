//! Page accessor module
//!
//! The collection engine drives pages only through the [`PageAccessor`]
//! capability set. This module defines that interface and provides an
//! implementation over rendered HTML snapshots, with two snapshot sources:
//! - [`BrowserlessSource`]: live rendering through a headless-browser service
//! - [`ReplaySource`]: recorded snapshots, for fixtures and offline reruns

mod browserless;
mod html;
mod replay;
mod traits;

pub use browserless::{build_http_client, BrowserlessOptions, BrowserlessSource};
pub use html::{parse_snapshot, HtmlPageAccessor, HtmlSource, RenderedItem, Snapshot};
pub use replay::ReplaySource;
pub use traits::{
    AccessorError, AccessorResult, ElementHandle, FieldRole, PageAccessor, SelectorRole,
    WaitCondition,
};
