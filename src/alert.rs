//! Alert system for displaying success and error messages to users.
//!
//! Alerts are HTML fragments that HTMX swaps into the page's alert container,
//! so a failed form submission keeps the form on screen with the message below it.

use axum::response::Html;
use maud::{Markup, html};

/// An alert message and its styling.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A message confirming that an operation worked.
    Success {
        /// The headline of the alert.
        message: String,
        /// Extra information shown below the headline.
        details: String,
    },
    /// A message explaining why an operation failed.
    Error {
        /// The headline of the alert.
        message: String,
        /// Extra information shown below the headline, e.g. how to fix the problem.
        details: String,
    },
}

impl Alert {
    /// Render the alert as an HTML fragment.
    pub fn into_markup(self) -> Markup {
        let (container_style, message, details) = match self {
            Alert::Success { message, details } => (
                "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 \
                dark:bg-gray-800 dark:text-green-400 border border-green-300 \
                dark:border-green-800",
                message,
                details,
            ),
            Alert::Error { message, details } => (
                "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
                dark:bg-gray-800 dark:text-red-400 border border-red-300 \
                dark:border-red-800",
                message,
                details,
            ),
        };

        html! {
            div class=(container_style) role="alert" data-alert="true"
            {
                div class="flex items-start justify-between gap-4"
                {
                    div
                    {
                        p class="font-semibold" { (message) }

                        @if !details.is_empty() {
                            p class="mt-1" { (details) }
                        }
                    }

                    button
                        type="button"
                        aria-label="Dismiss"
                        class="font-bold"
                        onclick="this.closest('[data-alert]').remove()"
                    {
                        "×"
                    }
                }
            }
        }
    }

    /// Render the alert as an HTML response body.
    pub fn into_html(self) -> Html<String> {
        Html(self.into_markup().into_string())
    }
}
