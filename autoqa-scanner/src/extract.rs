// Structural page extraction: forms, interactive elements, tables, key flows

use crate::driver::visible_text;
use crate::result::{
    FormButton, FormFacts, FormInput, InteractiveElement, KeyFlows, StructuralFacts, TableFacts,
};
use scraper::{ElementRef, Html, Selector};
use url::Url;

const ELEMENT_TEXT_LIMIT: usize = 50;
const MAIN_NAVIGATION_LIMIT: usize = 5;

/// Extract structural facts from page markup. Never fails: a page without
/// forms or tables simply yields empty collections.
pub fn extract_structure(html: &str, url: &str, title: &str) -> StructuralFacts {
    let document = Html::parse_document(html);

    StructuralFacts {
        title: title.to_string(),
        url: url.to_string(),
        forms: extract_forms(&document),
        buttons: extract_interactive_elements(&document),
        tables: extract_tables(&document),
        key_flows: identify_key_flows(&document, url),
    }
}

fn attr(element: &ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(|v| v.to_string())
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn extract_forms(document: &Html) -> Vec<FormFacts> {
    let form_selector = Selector::parse("form").unwrap();
    let input_selector = Selector::parse("input").unwrap();
    let button_selector = Selector::parse("button").unwrap();

    document
        .select(&form_selector)
        .map(|form| FormFacts {
            id: attr(&form, "id"),
            action: attr(&form, "action"),
            method: attr(&form, "method"),
            inputs: form
                .select(&input_selector)
                .map(|input| FormInput {
                    input_type: attr(&input, "type"),
                    name: attr(&input, "name"),
                    id: attr(&input, "id"),
                })
                .collect(),
            buttons: form
                .select(&button_selector)
                .map(|button| FormButton {
                    button_type: attr(&button, "type"),
                    text: visible_text(button),
                    id: attr(&button, "id"),
                })
                .collect(),
        })
        .collect()
}

fn extract_interactive_elements(document: &Html) -> Vec<InteractiveElement> {
    let selector = Selector::parse("button, a, input, select, textarea").unwrap();

    document
        .select(&selector)
        .map(|el| InteractiveElement {
            tag: el.value().name().to_string(),
            text: truncate_chars(&visible_text(el), ELEMENT_TEXT_LIMIT),
            id: attr(&el, "id"),
            element_type: attr(&el, "type"),
        })
        .collect()
}

fn extract_tables(document: &Html) -> Vec<TableFacts> {
    let table_selector = Selector::parse("table").unwrap();
    let header_selector = Selector::parse("th").unwrap();
    let row_selector = Selector::parse("tr").unwrap();

    document
        .select(&table_selector)
        .map(|table| TableFacts {
            id: attr(&table, "id"),
            headers: table.select(&header_selector).map(visible_text).collect(),
            row_count: table.select(&row_selector).count(),
        })
        .collect()
}

fn identify_key_flows(document: &Html, page_url: &str) -> KeyFlows {
    let nav_selector = Selector::parse("nav a, .menu a").unwrap();
    let action_selector = Selector::parse(".primary-btn, .cta-button").unwrap();
    let base = Url::parse(page_url).ok();

    // Browsers report resolved hrefs, so resolve against the page when we can
    let resolve = |href: &str| -> String {
        base.as_ref()
            .and_then(|b| b.join(href).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| href.to_string())
    };

    KeyFlows {
        main_navigation: document
            .select(&nav_selector)
            .take(MAIN_NAVIGATION_LIMIT)
            .map(|a| a.value().attr("href").map(resolve))
            .collect(),
        primary_actions: document.select(&action_selector).map(visible_text).collect(),
    }
}
