// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template variable substitution for sector messages.
//!
//! Supported variables: `{{nomeCliente}}`, `{{telefoneCliente}}`,
//! `{{nomeAtendente}}`, `{{nomeSetor}}`, `{{numeroTicket}}`,
//! `{{dataAtual}}`, `{{horaAtual}}`. Date and time render in display
//! locale (`%d/%m/%Y` / `%H:%M`).

use chrono::{DateTime, Local};

/// Values available to a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub agent_name: Option<String>,
    pub sector_name: Option<String>,
    pub ticket_number: Option<i64>,
}

/// Render a template with the current local date and time.
pub fn render(template: &str, ctx: &TemplateContext) -> String {
    render_at(template, ctx, Local::now())
}

/// Render a template at a fixed instant (used by tests).
pub fn render_at(template: &str, ctx: &TemplateContext, now: DateTime<Local>) -> String {
    template
        .replace("{{nomeCliente}}", ctx.customer_name.as_deref().unwrap_or(""))
        .replace(
            "{{telefoneCliente}}",
            ctx.customer_phone.as_deref().unwrap_or(""),
        )
        .replace("{{nomeAtendente}}", ctx.agent_name.as_deref().unwrap_or(""))
        .replace("{{nomeSetor}}", ctx.sector_name.as_deref().unwrap_or(""))
        .replace(
            "{{numeroTicket}}",
            &ctx.ticket_number.map(|n| n.to_string()).unwrap_or_default(),
        )
        .replace("{{dataAtual}}", &now.format("%d/%m/%Y").to_string())
        .replace("{{horaAtual}}", &now.format("%H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx() -> TemplateContext {
        TemplateContext {
            customer_name: Some("Maria".to_string()),
            customer_phone: Some("5511999999999".to_string()),
            agent_name: Some("Clara".to_string()),
            sector_name: Some("Suporte".to_string()),
            ticket_number: Some(42),
        }
    }

    #[test]
    fn substitutes_all_variables() {
        let template = "Ola {{nomeCliente}} ({{telefoneCliente}}), {{nomeAtendente}} do setor \
                        {{nomeSetor}} abriu o ticket #{{numeroTicket}}.";
        let rendered = render(template, &ctx());
        assert_eq!(
            rendered,
            "Ola Maria (5511999999999), Clara do setor Suporte abriu o ticket #42."
        );
    }

    #[test]
    fn date_and_time_use_display_locale() {
        let now = Local.with_ymd_and_hms(2026, 8, 7, 14, 30, 0).unwrap();
        let rendered = render_at("{{dataAtual}} {{horaAtual}}", &ctx(), now);
        assert_eq!(rendered, "07/08/2026 14:30");
    }

    #[test]
    fn missing_values_render_empty() {
        let rendered = render("Oi {{nomeCliente}}!", &TemplateContext::default());
        assert_eq!(rendered, "Oi !");
    }

    #[test]
    fn template_without_variables_is_untouched() {
        let rendered = render("Obrigado pelo contato!", &ctx());
        assert_eq!(rendered, "Obrigado pelo contato!");
    }
}
