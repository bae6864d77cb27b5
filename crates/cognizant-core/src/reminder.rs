use cognizant_storage::SessionGoal;

/// Reminder wording for `domain` under the current session goal
#[must_use]
pub fn reminder_text(domain: &str, goal: SessionGoal) -> String {
    match goal {
        SessionGoal::Study => format!(
            "It seems you're spending time on {domain}. \
             Would you like to get back to studying? Let's refocus!"
        ),
        SessionGoal::Focus => format!(
            "You've been on {domain} for a while. \
             Would you like to continue or take a short focus test?"
        ),
        SessionGoal::Relax => {
            "You're in relax mode, feel free to take it easy. \
             Would you still like a reminder to refocus?"
                .to_string()
        }
        SessionGoal::Other => {
            format!("Time spent on {domain} is getting high. Would you like to refocus now?")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_goal_has_its_own_text() {
        let study = reminder_text("example.com", SessionGoal::Study);
        let focus = reminder_text("example.com", SessionGoal::Focus);
        let relax = reminder_text("example.com", SessionGoal::Relax);
        let other = reminder_text("example.com", SessionGoal::Other);

        assert!(study.contains("studying"));
        assert!(focus.contains("focus test"));
        assert!(relax.contains("relax mode"));
        assert!(other.contains("getting high"));
    }

    #[test]
    fn test_domain_is_interpolated() {
        assert!(reminder_text("youtube.com", SessionGoal::Focus).contains("youtube.com"));
        assert!(reminder_text("youtube.com", SessionGoal::Other).contains("youtube.com"));
    }

    #[test]
    fn test_unrecognized_goal_uses_default_text() {
        let goal: SessionGoal = "gaming".parse().unwrap();
        assert_eq!(
            reminder_text("example.com", goal),
            "Time spent on example.com is getting high. Would you like to refocus now?"
        );
    }
}
