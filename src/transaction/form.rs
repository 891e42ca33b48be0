//! The page layout shared by the deposit, withdraw, transfer and loan request forms.

use maud::{Markup, html};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        dollar_input_styles, format_currency, loading_spinner,
    },
    navigation::NavBar,
};

pub struct AmountForm<'a> {
    /// The page title and form heading.
    pub title: &'a str,
    /// The page's own route, used to highlight the nav bar link.
    pub view: &'a str,
    /// The route the form posts to.
    pub endpoint: &'a str,
    pub submit_label: &'a str,
    /// The account balance shown above the form.
    pub balance: Decimal,
    /// Inputs placed before the amount input.
    pub extra_fields: Option<Markup>,
}

/// Render a full page with a form that posts an `amount` field.
///
/// Responses are swapped into the alert container, except for redirects.
pub fn amount_form_page(form: AmountForm<'_>) -> Markup {
    let nav_bar = NavBar::new(form.view).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-post=(form.endpoint)
                hx-target="#alert-container"
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                hx-disabled-elt="#submit-button"
                class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { (form.title) }

                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "Available balance: "
                    span data-balance { (format_currency(form.balance)) }
                }

                @if let Some(extra_fields) = form.extra_fields {
                    (extra_fields)
                }

                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                    // w-full needed to ensure input takes the full width when prefilled with a value
                    div class="input-wrapper w-full"
                    {
                        input
                            name="amount"
                            id="amount"
                            type="number"
                            step="0.01"
                            min="0.01"
                            placeholder="0.00"
                            required
                            autofocus
                            class=(FORM_TEXT_INPUT_STYLE);
                    }
                }

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span id="indicator" class="inline htmx-indicator"
                    {
                        (loading_spinner())
                    }
                    " " (form.submit_label)
                }
            }
        }
    };

    base(form.title, &[dollar_input_styles()], &content)
}

/// The raw form data posted by [amount_form_page].
///
/// The amount is parsed by the handler so that a bad amount gets an alert
/// instead of a rejected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountFormData {
    pub amount: String,
}
