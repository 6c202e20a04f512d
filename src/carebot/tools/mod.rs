//! Built-in HTTP-backed tools.
//!
//! - **Reminder** (`create_reminder`): POSTs `{username, description}` to the reminder service.
//! - **Web search** (`tavily_search`): queries the Tavily search API, capped at a result limit.
//!
//! Both implement [`ToolProtocol`](crate::tool_protocol::ToolProtocol) directly and are
//! registered on an agent's [`ToolRegistry`](crate::tool_protocol::ToolRegistry):
//!
//! ```ignore
//! let mut registry = ToolRegistry::empty();
//! registry.add_protocol(Arc::new(TavilySearchTool::new(api_key, 3))).await?;
//! registry.add_protocol(Arc::new(ReminderTool::new(reminder_url))).await?;
//! ```

pub mod reminder;
pub mod web_search;

pub use reminder::{ReminderTool, REMINDER_TOOL_NAME};
pub use web_search::{SearchHit, TavilySearchTool, DEFAULT_TAVILY_BASE_URL, SEARCH_TOOL_NAME};
