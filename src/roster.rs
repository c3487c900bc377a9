use std::collections::HashMap;

use tracing::warn;

use crate::models::AgentInfo;
use crate::table::Table;

/// Roster lookup keyed by normalized agent email.
pub type Roster = HashMap<String, AgentInfo>;

/// Materializes the roster snapshot into an email-keyed lookup. Any
/// organizational column absent from the snapshot is injected as an empty
/// string. A duplicated email resolves to its last row, keeping the daily
/// matrix at one row per (agent, date).
pub fn parse_roster(table: Option<&Table>) -> Roster {
    let Some(table) = table else {
        return Roster::new();
    };
    if table.column("Email Cabify").is_none() {
        if !table.is_empty() {
            warn!("roster snapshot has no 'Email Cabify' column, identity fields will be blank");
        }
        return Roster::new();
    }

    let mut roster = Roster::new();
    for row in table.rows() {
        let Some(email) = row.get("Email Cabify") else {
            continue;
        };
        let field = |name: &str| row.get(name).unwrap_or("").to_string();
        roster.insert(
            email.to_lowercase(),
            AgentInfo {
                first_name: field("Nombre"),
                last_name: field("Primer Apellido"),
                second_last_name: field("Segundo Apellido"),
                contract_type: field("Tipo contrato"),
                start_date: field("Ingreso"),
                supervisor: field("Supervisor"),
                supervisor_email: field("Correo Supervisor"),
            },
        );
    }
    roster
}

/// Identity fields for one agent key. Unmatched agents get blank fields
/// rather than being dropped, so source volume is never silently lost when
/// the roster is incomplete.
pub fn attach(roster: &Roster, agent_email: &str) -> AgentInfo {
    roster.get(agent_email).cloned().unwrap_or_default()
}
