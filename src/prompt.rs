//! Prompt composition for a single form question.
//!
//! [`compose`] is pure: the same profile and question always produce the same
//! prompt. Layout:
//!
//! ```text
//! <persona line>
//!
//! <profile prose>            (omitted when every field is blank)
//!
//! <answering instructions>
//! <question>
//! ```

use crate::profile::UserProfile;

const PERSONA: &str = "You are filling in an application form on behalf of the applicant \
described below. Answer in the first person, as the applicant.";

const INSTRUCTIONS: &str = "Answer the following question. Be concise and specific. \
Write plain prose only: do not use headings, bullet points, or markers such as #, * or -. \
Output only the answer itself, with no preamble.";

/// Build the completion prompt for `question` personalised with `profile`.
pub fn compose(profile: &UserProfile, question: &str) -> String {
    let mut prompt = String::from(PERSONA);

    let background = profile_prose(profile);
    if !background.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&background);
    }

    prompt.push_str("\n\n");
    prompt.push_str(INSTRUCTIONS);
    prompt.push('\n');
    prompt.push_str(question.trim());
    prompt
}

fn profile_prose(profile: &UserProfile) -> String {
    let sentences = [
        ("About the applicant: ", profile.bio.trim()),
        ("Experience so far: ", profile.experience.trim()),
        ("Projects built so far: ", profile.projects.trim()),
    ];

    sentences
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(lead, value)| {
            let mut s = format!("{lead}{value}");
            if !s.ends_with(['.', '!', '?']) {
                s.push('.');
            }
            s
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            bio: "Backend engineer based in Osaka".into(),
            experience: "Five years building payment APIs in Go and Rust".into(),
            projects: "An open-source rate limiter and a CLI for log triage.".into(),
        }
    }

    #[test]
    fn embeds_profile_and_question() {
        let p = compose(&profile(), "Why this company?");
        assert!(p.contains("About the applicant: Backend engineer based in Osaka."));
        assert!(p.contains("Experience so far: Five years building payment APIs in Go and Rust."));
        assert!(p.contains("Projects built so far: An open-source rate limiter and a CLI for log triage."));
        assert!(p.ends_with("\nWhy this company?"));
    }

    #[test]
    fn instructs_plain_concise_answer_only() {
        let p = compose(&profile(), "Strengths?");
        assert!(p.contains("concise"));
        assert!(p.contains("plain prose"));
        assert!(p.contains("Output only the answer"));
    }

    #[test]
    fn deterministic() {
        assert_eq!(compose(&profile(), "Name?"), compose(&profile(), "Name?"));
    }

    #[test]
    fn blank_fields_are_omitted() {
        let partial = UserProfile { bio: "Designer".into(), ..UserProfile::default() };
        let p = compose(&partial, "Name?");
        assert!(p.contains("About the applicant: Designer."));
        assert!(!p.contains("Experience so far"));
        assert!(!p.contains("Projects built so far"));

        let empty = compose(&UserProfile::default(), "Name?");
        assert!(!empty.contains("About the applicant"));
        assert!(empty.ends_with("\nName?"));
    }

    #[test]
    fn question_is_trimmed() {
        let p = compose(&profile(), "  Strengths?\n");
        assert!(p.ends_with("\nStrengths?"));
    }
}
