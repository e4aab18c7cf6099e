//! Plain-text rendering for the terminal.

use crate::state::{CameraStatus, CheckinState, Modal, Phase, ScanHistory, ScanResult};
use turnstile_api::{
    AttendeeStats, EventSummary, Page, PlatformStats, Transaction, UserDetails, UserRecord,
};

/// Attendance counters of one event
#[must_use]
pub fn render_stats(stats: &AttendeeStats) -> String {
    format!(
        "Total: {}  Checked in: {}  Pending: {}  Check-in rate: {}%",
        stats.total,
        stats.checked_in,
        stats.active,
        stats.check_in_rate()
    )
}

/// Result card of one attempt
#[must_use]
pub fn render_result(result: &ScanResult) -> String {
    let mark = if result.success { "OK" } else { "FAILED" };
    let mut lines = vec![format!("[{mark}] {}", result.message)];
    if let Some(attendee) = &result.attendee {
        lines.push(format!("  {} <{}>", attendee.name, attendee.email));
        lines.push(format!(
            "  {} / {} / {}",
            attendee.event, attendee.ticket_type, attendee.status
        ));
    }
    lines.push(format!("  at {}", result.timestamp.format("%H:%M:%S")));
    lines.join("\n")
}

/// Open dialog
#[must_use]
pub fn render_modal(modal: &Modal) -> String {
    match modal {
        Modal::Success { result, .. } => {
            let name = result
                .attendee
                .as_ref()
                .map_or("Attendee", |attendee| attendee.name.as_str());
            format!("== Check-in successful ==\n{name}\n{}", render_result(result))
        },
        Modal::Error { message } => format!("== Check-in failed ==\n{message}"),
    }
}

/// Recent scans with their success rate
#[must_use]
pub fn render_history(history: &ScanHistory) -> String {
    if history.is_empty() {
        return "No scans yet".to_string();
    }

    let header = format!(
        "Recent scans ({}, {}% successful)",
        history.len(),
        history.success_rate()
    );
    let entries = history.iter().map(|result| {
        let label = result
            .attendee
            .as_ref()
            .map_or(result.message.as_str(), |attendee| attendee.name.as_str());
        let mark = if result.success { "ok " } else { "err" };
        format!("  {} {mark} {label}", result.timestamp.format("%H:%M:%S"))
    });
    std::iter::once(header)
        .chain(entries)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered event list, marking the selected event
#[must_use]
pub fn render_events(events: &[EventSummary], selected: Option<&str>) -> String {
    if events.is_empty() {
        return "No events".to_string();
    }

    events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let marker = if selected == Some(event.id.as_str()) { '*' } else { ' ' };
            format!(
                "{marker} {}. {} ({}, {}) [{}]",
                index + 1,
                event.title,
                event.start_date,
                event.location,
                event.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One-line status of the workflow
#[must_use]
pub fn render_status(state: &CheckinState) -> String {
    let event = state
        .selected()
        .map_or_else(|| state.selected_event.clone().unwrap_or_default(), |e| e.title.clone());
    let camera = match &state.camera {
        CameraStatus::Unknown | CameraStatus::Off => "camera off".to_string(),
        CameraStatus::Unavailable => "no camera, manual entry".to_string(),
        CameraStatus::Starting => "camera starting".to_string(),
        CameraStatus::Active => "scanning".to_string(),
        CameraStatus::Failed { message } => format!("{message}, manual entry"),
    };
    match state.phase() {
        Phase::Idle => "No event selected".to_string(),
        Phase::EventSelected | Phase::Scanning | Phase::ManualEntry => {
            format!("{event}: {camera}")
        },
    }
}

// ===== Admin =====

/// Platform dashboard
#[must_use]
pub fn render_platform_stats(stats: &PlatformStats) -> String {
    format!(
        "Users: {} (guests {}%, hosts {}%, admins {}%)\n\
         Events: {}  Tickets: {}\n\
         Newsletter: {} ({}%)\n\
         Events per host: {:.1}  Tickets per event: {:.1}  Tickets per user: {:.1}",
        stats.total_users,
        stats.guest_share(),
        stats.host_share(),
        stats.admin_share(),
        stats.total_events,
        stats.total_tickets,
        stats.newsletter_subscribers,
        stats.newsletter_share(),
        stats.events_per_host(),
        stats.tickets_per_event(),
        stats.tickets_per_user()
    )
}

fn page_footer<T>(page: &Page<T>) -> String {
    let more = if page.has_more { ", more available" } else { "" };
    format!("{} of {}{more}", page.data.len(), page.total)
}

/// A page of users
#[must_use]
pub fn render_users(page: &Page<UserRecord>) -> String {
    let mut lines: Vec<String> = page
        .data
        .iter()
        .map(|user| {
            let newsletter = if user.newsletter_subscribed { " (newsletter)" } else { "" };
            format!(
                "{}  {:<10} {} <{}> @{}{newsletter}",
                user.id,
                user.role.as_str(),
                user.name,
                user.email,
                user.username
            )
        })
        .collect();
    lines.push(page_footer(page));
    lines.join("\n")
}

/// One user with ticket and event counts
#[must_use]
pub fn render_user_details(details: &UserDetails) -> String {
    let user = &details.user;
    format!(
        "{} <{}> @{}\nRole: {}\nJoined: {}\nTickets: {}  Events: {}",
        user.name,
        user.email,
        user.username,
        user.role,
        user.created_at,
        details.tickets.len(),
        details.events.len()
    )
}

/// A page of transactions with the completed total
#[must_use]
pub fn render_transactions(page: &Page<Transaction>) -> String {
    let mut lines: Vec<String> = page
        .data
        .iter()
        .map(|tx| {
            let mut line = format!(
                "{}  {:>12.2} {}  {:<9} {}",
                tx.reference, tx.amount, tx.currency, tx.status, tx.method
            );
            if let Some(event) = &tx.event {
                line.push_str("  ");
                line.push_str(&event.title);
            }
            if let Some(reason) = &tx.failure_reason {
                line.push_str("  (");
                line.push_str(reason);
                line.push(')');
            }
            line
        })
        .collect();
    lines.push(format!("Completed on this page: {:.2}", page.completed_amount()));
    lines.push(page_footer(page));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{accepted, event, fixed_timestamp};

    #[test]
    fn test_stats_show_pending_and_rate() {
        let stats = AttendeeStats {
            total: 10,
            checked_in: 4,
            active: 5,
            cancelled: 1,
        };
        assert_eq!(
            render_stats(&stats),
            "Total: 10  Checked in: 4  Pending: 5  Check-in rate: 40%"
        );
        assert!(render_stats(&AttendeeStats::default()).ends_with("Check-in rate: 0%"));
    }

    #[test]
    fn test_success_modal_names_attendee() {
        let result =
            ScanResult::from_response(accepted("Jane Doe", "ABC123"), fixed_timestamp());
        let rendered = render_modal(&Modal::Success { result, seq: 1 });
        assert!(rendered.contains("Jane Doe"));
        assert!(rendered.contains("[OK] Check-in successful"));
    }

    #[test]
    fn test_result_card_layout() {
        let result =
            ScanResult::from_response(accepted("Jane Doe", "ABC123"), fixed_timestamp());
        assert_eq!(
            render_result(&result),
            "[OK] Check-in successful\n  \
             Jane Doe <jane.doe@example.com>\n  \
             Launch Party / General / checked_in\n  \
             at 00:00:00"
        );

        let failed = ScanResult::failure("Ticket already used", fixed_timestamp());
        assert_eq!(render_result(&failed), "[FAILED] Ticket already used\n  at 00:00:00");
    }

    #[test]
    fn test_transactions_one_line_each_then_totals() {
        let tx = |reference: &str, status: &str, reason: Option<&str>| Transaction {
            id: format!("tx-{reference}"),
            reference: reference.to_string(),
            amount: 5_000.0,
            currency: "NGN".to_string(),
            status: status.to_string(),
            method: "card".to_string(),
            created_at: "2025-01-01".to_string(),
            processed_at: None,
            failure_reason: reason.map(str::to_string),
            event: None,
            user: None,
        };
        let page = Page {
            data: vec![
                tx("ref-1", "completed", None),
                tx("ref-2", "failed", Some("Card declined")),
            ],
            total: 2,
            has_more: false,
        };

        let rendered = render_transactions(&page);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ref-1"));
        assert!(lines[0].ends_with("NGN  completed card"));
        assert!(lines[1].ends_with("failed    card  (Card declined)"));
        assert_eq!(lines[2], "Completed on this page: 5000.00");
        assert_eq!(lines[3], "2 of 2");
    }

    #[test]
    fn test_history_lists_newest_first() {
        let mut history = ScanHistory::default();
        history.push(
            ScanResult::from_response(accepted("Jane Doe", "A"), fixed_timestamp()),
            10,
        );
        history.push(ScanResult::failure("Ticket already used", fixed_timestamp()), 10);

        let rendered = render_history(&history);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Recent scans (2, 50% successful)");
        assert!(lines[1].ends_with("err Ticket already used"));
        assert!(lines[2].ends_with("ok  Jane Doe"));
        assert_eq!(render_history(&ScanHistory::default()), "No scans yet");
    }

    #[test]
    fn test_events_mark_selection() {
        let events = vec![event("E1", "Launch Party"), event("E2", "Afterparty")];
        let rendered = render_events(&events, Some("E2"));
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[0].starts_with("  1. Launch Party"));
        assert!(lines[1].starts_with("* 2. Afterparty"));
    }

    #[test]
    fn test_status_line() {
        let mut state = CheckinState::default();
        assert_eq!(render_status(&state), "No event selected");

        state.events = vec![event("E1", "Launch Party")];
        state.selected_event = Some("E1".to_string());
        state.camera = CameraStatus::Active;
        assert_eq!(render_status(&state), "Launch Party: scanning");
    }

    #[test]
    fn test_platform_stats_ratios() {
        let stats = PlatformStats {
            total_users: 200,
            guest_users: 150,
            host_users: 40,
            admin_users: 10,
            total_events: 90,
            total_tickets: 1_200,
            newsletter_subscribers: 68,
        };
        let rendered = render_platform_stats(&stats);
        assert!(rendered.contains("guests 75%"));
        assert!(rendered.contains("Events per host: 2.3"));
        assert!(rendered.contains("Tickets per user: 6.0"));
    }
}
