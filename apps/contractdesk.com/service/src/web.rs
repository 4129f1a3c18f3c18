use maud::{DOCTYPE, Markup, PreEscaped, html};

use contractdesk_client_core::dropdown::{Dropdown, DropdownSet};
use contractdesk_client_core::form::AgentEmailDisplay;
use contractdesk_client_core::submit::Banner;

const HTMX_ASSET_PATH: &str = "/assets/htmx-2_0_8-5e62a814.js";

/// Everything the page needs: the three dropdowns as the engine currently
/// knows them, plus an optional one-shot banner.
#[derive(Debug, Clone)]
pub struct FormPageView {
    pub dropdowns: DropdownSet,
    pub banner: Option<Banner>,
    pub banner_ttl_ms: u64,
}

pub fn render_page(view: &FormPageView) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Contract Creator | ContractDesk" }
                style { (PreEscaped(styles())) }
                script src=(HTMX_ASSET_PATH) defer {}
            }
            body {
                div class="cd-bg" {}
                div class="cd-app" {
                    header class="cd-topbar" {
                        div class="cd-brand" { "ContractDesk" }
                        span class="cd-topbar-label" { "Contract Creator" }
                    }
                    (form_shell(view))
                }
            }
        }
    };

    markup.into_string()
}

/// The swap target for a post-submission re-render: the whole form card,
/// cleared, with the outcome banner in place.
pub fn render_form_fragment(view: &FormPageView) -> String {
    form_shell(view).into_string()
}

pub fn render_banner_fragment(banner: Option<&Banner>, ttl_ms: u64) -> String {
    banner_slot(banner, ttl_ms).into_string()
}

pub fn render_agent_email_fragment(display: &AgentEmailDisplay) -> String {
    agent_email_line(display).into_string()
}

fn form_shell(view: &FormPageView) -> Markup {
    html! {
        main id="cd-form-shell" class="cd-main" {
            section class="cd-card" {
                h1 { "Create a Contract" }
                p class="cd-muted" {
                    "Select the agent, contract type, and property, then send the "
                    "contract to the signing workflow."
                }
                (banner_slot(view.banner.as_ref(), view.banner_ttl_ms))
                form id="contract-form" class="cd-form"
                    hx-post="/form/submit"
                    hx-target="#form-banner"
                    hx-swap="outerHTML" {
                    label for="agent" { "Agent" }
                    select id="agent" name="agent" class="cd-select" required
                        hx-get="/form/agent-email"
                        hx-target="#agent-email"
                        hx-swap="outerHTML" {
                        (dropdown_options(&view.dropdowns.agents))
                    }
                    (agent_email_line(&AgentEmailDisplay::Hidden))

                    label for="contractType" { "Contract type" }
                    select id="contractType" name="contractType" class="cd-select" required
                        hx-get="/form/contract-type-change"
                        hx-swap="none" {
                        (dropdown_options(&view.dropdowns.templates))
                    }

                    label for="property" { "Property" }
                    select id="property" name="property" class="cd-select" required
                        hx-get="/form/property-change"
                        hx-swap="none" {
                        (dropdown_options(&view.dropdowns.properties))
                    }

                    label for="sellerName" { "Seller name" }
                    input id="sellerName" type="text" name="sellerName" class="cd-input"
                        placeholder="Full name of the seller" required;

                    label for="customerName" { "Customer name" }
                    input id="customerName" type="text" name="customerName" class="cd-input"
                        placeholder="Full name of the customer" required;

                    label for="signingPlace" { "Signing place" }
                    input id="signingPlace" type="text" name="signingPlace" class="cd-input"
                        placeholder="City where the contract is signed" required;

                    div class="cd-actions" {
                        button type="submit" class="cd-btn primary" { "Create Contract" }
                        span class="htmx-indicator cd-indicator" { "Submitting..." }
                        button type="button" class="cd-btn template"
                            hx-post="/form/template"
                            hx-include="closest form"
                            hx-target="#form-banner"
                            hx-swap="outerHTML" {
                            "Create a New Template"
                        }
                        span class="htmx-indicator cd-indicator" { "Creating Template..." }
                    }
                }
            }
        }
    }
}

fn dropdown_options(dropdown: &Dropdown) -> Markup {
    html! {
        @for option in dropdown.options() {
            option value=(option.value)
                data-contract-type=[option.contract_type.as_deref()]
                data-template-link=[option.template_link.as_deref()] {
                (option.label)
            }
        }
    }
}

fn agent_email_line(display: &AgentEmailDisplay) -> Markup {
    match display.message() {
        Some(text) => html! {
            div id="agent-email" class="cd-agent-email" { (text) }
        },
        None => html! {
            div id="agent-email" class="cd-agent-email hidden" {}
        },
    }
}

fn banner_slot(banner: Option<&Banner>, ttl_ms: u64) -> Markup {
    match banner {
        Some(banner) => html! {
            div id="form-banner"
                class={(if banner.is_error() { "cd-notice error" } else { "cd-notice" })}
                hx-get="/form/banner/clear"
                hx-trigger={(format!("load delay:{ttl_ms}ms"))}
                hx-swap="outerHTML" {
                (banner.text)
            }
        },
        None => html! {
            div id="form-banner" class="cd-notice hidden" {}
        },
    }
}

fn styles() -> &'static str {
    r#"
:root {
  color-scheme: dark;
  --bg: #0b0e11;
  --panel: rgba(20, 25, 30, 0.92);
  --panel-border: rgba(130, 156, 148, 0.26);
  --text: #e9f0ec;
  --muted: #93a39b;
  --accent: #34c98e;
  --danger: #ff7a85;
}
* { box-sizing: border-box; }
html, body { margin: 0; min-height: 100%; width: 100%; background: var(--bg); color: var(--text); }
body {
  font-family: "IBM Plex Sans", "SF Pro Text", -apple-system, BlinkMacSystemFont, sans-serif;
  -webkit-font-smoothing: antialiased;
}
.cd-bg {
  position: fixed;
  inset: 0;
  background: radial-gradient(120% 120% at 15% 0%, rgba(52, 201, 142, 0.14) 0%, rgba(52, 201, 142, 0) 55%),
              linear-gradient(180deg, #0a0d10 0%, #0e1318 60%, #090c0f 100%);
  pointer-events: none;
  z-index: 0;
}
.cd-app { position: relative; z-index: 1; min-height: 100vh; display: flex; flex-direction: column; }
.cd-topbar {
  display: flex;
  gap: 0.8rem;
  align-items: baseline;
  padding: 0.85rem 1.2rem;
  border-bottom: 1px solid var(--panel-border);
  background: rgba(10, 14, 17, 0.8);
}
.cd-brand { font-weight: 700; letter-spacing: 0.05em; text-transform: uppercase; font-size: 0.8rem; }
.cd-topbar-label { color: var(--muted); font-size: 0.84rem; }
.cd-main { padding: 1.4rem 1rem; width: 100%; max-width: 680px; margin: 0 auto; }
.cd-card {
  border: 1px solid var(--panel-border);
  border-radius: 14px;
  background: var(--panel);
  box-shadow: 0 16px 48px rgba(3, 8, 6, 0.45);
  padding: 1.4rem;
}
.cd-card h1 { margin: 0 0 0.3rem; font-size: 1.3rem; }
.cd-muted { color: var(--muted); line-height: 1.5; margin-top: 0; }
.cd-form { display: grid; gap: 0.5rem; margin-top: 0.9rem; }
label { font-size: 0.8rem; color: var(--muted); text-transform: uppercase; letter-spacing: 0.05em; margin-top: 0.4rem; }
.cd-input, .cd-select {
  width: 100%;
  border: 1px solid rgba(130, 156, 148, 0.35);
  border-radius: 10px;
  padding: 0.56rem 0.62rem;
  background: rgba(10, 15, 13, 0.95);
  color: var(--text);
  font: inherit;
}
.cd-input:focus, .cd-select:focus {
  outline: none;
  border-color: rgba(52, 201, 142, 0.8);
  box-shadow: 0 0 0 2px rgba(52, 201, 142, 0.25);
}
.cd-agent-email {
  color: var(--accent);
  font-size: 0.86rem;
  padding: 0.15rem 0.1rem;
}
.cd-actions { display: flex; gap: 0.7rem; align-items: center; flex-wrap: wrap; margin-top: 0.9rem; }
.cd-btn {
  appearance: none;
  border: 1px solid rgba(130, 156, 148, 0.4);
  border-radius: 10px;
  background: rgba(22, 30, 27, 0.9);
  color: var(--text);
  padding: 0.5rem 0.85rem;
  font-size: 0.92rem;
  cursor: pointer;
}
.cd-btn:hover { border-color: rgba(52, 201, 142, 0.6); }
.cd-btn.primary { background: linear-gradient(180deg, #1f8f63 0%, #14684a 100%); border-color: rgba(62, 214, 152, 0.55); }
.cd-btn:disabled { opacity: 0.6; cursor: wait; }
.cd-notice {
  border: 1px solid rgba(62, 214, 152, 0.5);
  background: rgba(18, 66, 48, 0.5);
  color: #d9f7e8;
  border-radius: 10px;
  padding: 0.6rem 0.72rem;
  font-size: 0.9rem;
  margin-top: 0.4rem;
}
.cd-notice.error {
  border-color: rgba(255, 122, 133, 0.55);
  background: rgba(96, 24, 33, 0.4);
  color: #ffdde1;
}
.hidden { display: none; }
.cd-indicator { color: var(--muted); font-size: 0.8rem; }
@media (max-width: 560px) {
  .cd-actions { flex-direction: column; align-items: stretch; }
}
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use contractdesk_client_core::records::{AgentRecord, TemplateRecord};
    use contractdesk_client_core::sync::{FormEngine, KindRecords};

    fn empty_view() -> FormPageView {
        FormPageView {
            dropdowns: DropdownSet::default(),
            banner: None,
            banner_ttl_ms: 5_000,
        }
    }

    fn populated_view() -> FormPageView {
        let mut engine = FormEngine::default();
        engine.apply(KindRecords::Agents(vec![AgentRecord {
            user_id: "u1".to_string(),
            user_name: "Ann".to_string(),
            user_email: "ann@x.com".to_string(),
        }]));
        engine.apply(KindRecords::Templates(vec![TemplateRecord {
            id: "3".to_string(),
            template_name: "Lease".to_string(),
            template_link: "https://x/lease".to_string(),
        }]));
        FormPageView {
            dropdowns: engine.dropdowns,
            banner: None,
            banner_ttl_ms: 5_000,
        }
    }

    #[test]
    fn page_renders_placeholders_before_population() {
        let html = render_page(&empty_view());
        assert!(html.contains("Select agent"));
        assert!(html.contains("Select contract type"));
        assert!(html.contains("Select a property"));
        assert!(html.contains(&format!("src=\"{HTMX_ASSET_PATH}\"")));
        assert!(html.contains("hx-post=\"/form/submit\""));
    }

    #[test]
    fn populated_dropdowns_render_labels_and_template_attributes() {
        let html = render_page(&populated_view());
        assert!(html.contains("[u1 Ann]"));
        assert!(html.contains(">Lease</option>"));
        assert!(html.contains("data-contract-type=\"Lease\""));
        assert!(html.contains("data-template-link=\"https://x/lease\""));
    }

    #[test]
    fn banner_fragment_auto_hides_on_the_configured_delay() {
        let html = render_banner_fragment(Some(&Banner::success("Contract sent!")), 5_000);
        assert!(html.contains("Contract sent!"));
        assert!(html.contains("load delay:5000ms"));
        assert!(html.contains("hx-get=\"/form/banner/clear\""));

        let hidden = render_banner_fragment(None, 5_000);
        assert!(hidden.contains("hidden"));
        assert!(!hidden.contains("load delay"));
    }

    #[test]
    fn error_banner_carries_the_error_class() {
        let html = render_banner_fragment(Some(&Banner::error("Webhook error: 503")), 5_000);
        assert!(html.contains("cd-notice error"));
    }

    #[test]
    fn agent_email_fragment_tracks_the_display_state() {
        let hidden = render_agent_email_fragment(&AgentEmailDisplay::Hidden);
        assert!(hidden.contains("hidden"));

        let shown =
            render_agent_email_fragment(&AgentEmailDisplay::SendTo("ann@x.com".to_string()));
        assert!(shown.contains("Contract will be sent to: ann@x.com"));
        assert!(!shown.contains("hidden"));
    }

    #[test]
    fn form_fragment_is_the_shell_without_the_page_chrome() {
        let fragment = render_form_fragment(&empty_view());
        assert!(fragment.starts_with("<main id=\"cd-form-shell\""));
        assert!(!fragment.contains("<html"));
        assert!(!fragment.contains("<head"));
    }
}
