//! Formatter: a deterministic rendering of the research into a cited answer.
//!
//! Sources are harvested from the `URL:`/`Title:` lines the web actions emit
//! and from any other URLs in the findings. Findings from the current run
//! are numbered first. URLs the answer mentions are replaced by their `[n]`
//! reference and a numbered Sources section is appended.

use crate::reasoning::COMPLETION_MARKER;
use regex::Regex;
use rustedscout_core::message::Role;
use rustedscout_core::state::AgentState;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'()\[\]]+"#).ok());

/// One cited source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The final, user-facing result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub text: String,
    pub sources: Vec<Source>,
    /// No findings were gathered; `text` says so.
    pub insufficient: bool,
}

pub struct CitationFormatter {
    max_sources: usize,
}

impl Default for CitationFormatter {
    fn default() -> Self {
        Self { max_sources: 20 }
    }
}

impl CitationFormatter {
    pub fn new(max_sources: usize) -> Self {
        Self { max_sources }
    }

    /// Render `state` into a cited response. Pure: identical state gives
    /// identical output.
    pub fn format(&self, state: &AgentState) -> FinalResponse {
        let query = state.latest_query().unwrap_or_default();
        let answer = final_answer(state);

        if state.research_content.trim().is_empty() {
            return insufficient_response(query, answer.as_deref());
        }

        let sources = self.collect_sources(state);
        let body = match answer {
            Some(answer) => cite(&answer, &sources),
            None => format!(
                "Research findings for \"{query}\" were gathered from the sources below."
            ),
        };

        let mut text = body;
        if !sources.is_empty() {
            text.push_str("\n\n## Sources\n");
            for (i, source) in sources.iter().enumerate() {
                match &source.title {
                    Some(title) => text.push_str(&format!("\n[{}] {title}: {}", i + 1, source.url)),
                    None => text.push_str(&format!("\n[{}] {}", i + 1, source.url)),
                }
            }
        }

        FinalResponse {
            text,
            sources,
            insufficient: false,
        }
    }

    fn collect_sources(&self, state: &AgentState) -> Vec<Source> {
        let mut sources = Vec::new();
        for message in state.current_run() {
            let succeeded = message.metadata.get("success").and_then(|v| v.as_bool());
            if message.role == Role::ActionResult && succeeded != Some(false) {
                harvest(&message.content, &mut sources);
            }
        }
        harvest(&state.research_content, &mut sources);
        sources.truncate(self.max_sources);
        sources
    }
}

/// The model's closing text for the current run, marker removed.
///
/// Prefers the last assistant message without action requests.
fn final_answer(state: &AgentState) -> Option<String> {
    let cleaned = |content: &str| {
        let text = content.replace(COMPLETION_MARKER, "");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    };
    let assistants = || {
        state
            .current_run()
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
    };

    assistants()
        .filter(|m| !m.has_actions())
        .find_map(|m| cleaned(&m.content))
        .or_else(|| assistants().find_map(|m| cleaned(&m.content)))
}

fn insufficient_response(query: &str, answer: Option<&str>) -> FinalResponse {
    let mut text = format!(
        "Insufficient information: no research findings were gathered for \"{query}\", so no cited answer can be given."
    );
    if let Some(answer) = answer {
        text.push_str("\n\nUnverified answer from the model:\n\n");
        text.push_str(answer);
    }
    FinalResponse {
        text,
        sources: Vec::new(),
        insufficient: true,
    }
}

/// Collect sources from action output into `sources`, skipping duplicates.
fn harvest(text: &str, sources: &mut Vec<Source>) {
    let mut pending_title: Option<String> = None;
    let mut untitled: Option<usize> = None;

    for line in text.lines() {
        let line = line.trim();
        let is_header = line.starts_with("RESULT ")
            || line.starts_with("EXTRACT RESULT ")
            || line.starts_with("### ");
        if is_header {
            pending_title = None;
            untitled = None;
        } else if let Some(title) = line.strip_prefix("Title:") {
            let title = title.trim();
            if title.is_empty() || title == "No title" {
                continue;
            }
            match untitled.take() {
                Some(i) => sources[i].title = Some(title.to_string()),
                None => pending_title = Some(title.to_string()),
            }
        } else if let Some(url) = line.strip_prefix("URL:") {
            let url = clean_url(url.trim());
            if !url.starts_with("http") {
                continue;
            }
            let index = add_source(sources, url, pending_title.take());
            untitled = sources[index].title.is_none().then_some(index);
        } else if line.starts_with("Image ") || line.starts_with("Failed ") {
            // Images and failed extractions are not sources.
        } else if let Some(re) = URL_PATTERN.as_ref() {
            for found in re.find_iter(line) {
                add_source(sources, clean_url(found.as_str()), None);
            }
        }
    }
}

fn add_source(sources: &mut Vec<Source>, url: &str, title: Option<String>) -> usize {
    if let Some(i) = sources.iter().position(|s| s.url == url) {
        if sources[i].title.is_none() {
            sources[i].title = title;
        }
        return i;
    }
    sources.push(Source {
        url: url.to_string(),
        title,
    });
    sources.len() - 1
}

fn clean_url(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ';', ':', '!', '?'])
}

/// Replace source URLs in `answer` with `[n]` references.
///
/// Only whole URL tokens that exactly match a source are cited; trailing
/// punctuation stays in the text.
fn cite(answer: &str, sources: &[Source]) -> String {
    let Some(re) = URL_PATTERN.as_ref() else {
        return answer.to_string();
    };
    re.replace_all(answer, |caps: &regex::Captures<'_>| {
        let token = &caps[0];
        let url = clean_url(token);
        match sources.iter().position(|s| s.url == url) {
            Some(i) => format!("[{}]{}", i + 1, &token[url.len()..]),
            None => token.to_string(),
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustedscout_core::action::ActionResult;
    use rustedscout_core::message::{ActionRequest, Message};

    fn researched_state(answer: &str) -> AgentState {
        let mut state = AgentState::new("What is AI?");
        let search = ActionRequest::new("web_search", serde_json::json!({"query": "AI"}));
        state.push(Message::assistant_with_actions("Searching", vec![search.clone()]));
        let output = "\nRESULT 1:\nTitle: Artificial intelligence\nURL: https://en.example/ai\nContent: AI is...\n\nRESULT 2:\nTitle: No title\nURL: https://b.example/ml.\nContent: See https://c.example/deep for more.\n";
        let result = ActionResult {
            request: search.clone(),
            outcome: Ok(output.into()),
        };
        state.push(result.to_message());
        state.append_research(&format!("web_search ({})", search.id), output);
        state.push(Message::assistant(answer));
        state
    }

    #[test]
    fn formats_answer_with_numbered_sources() {
        let state = researched_state(
            "AI is the field of intelligent agents (https://en.example/ai). RESEARCH_COMPLETE",
        );
        let response = CitationFormatter::default().format(&state);

        assert!(!response.insufficient);
        assert_eq!(
            response.sources,
            vec![
                Source {
                    url: "https://en.example/ai".into(),
                    title: Some("Artificial intelligence".into())
                },
                Source {
                    url: "https://b.example/ml".into(),
                    title: None
                },
                Source {
                    url: "https://c.example/deep".into(),
                    title: None
                },
            ]
        );
        assert!(response.text.starts_with("AI is the field of intelligent agents ([1])."));
        assert!(!response.text.contains(COMPLETION_MARKER));
        assert!(response.text.contains("## Sources\n\n[1] Artificial intelligence: https://en.example/ai"));
        assert!(response.text.contains("[3] https://c.example/deep"));
    }

    #[test]
    fn formatting_is_idempotent() {
        let state = researched_state("Answer RESEARCH_COMPLETE");
        let formatter = CitationFormatter::default();
        assert_eq!(formatter.format(&state), formatter.format(&state));
    }

    #[test]
    fn empty_research_is_insufficient() {
        let mut state = AgentState::new("What is AI?");
        state.push(Message::assistant("From memory: AI is... RESEARCH_COMPLETE"));
        let response = CitationFormatter::default().format(&state);

        assert!(response.insufficient);
        assert!(response.sources.is_empty());
        assert!(response.text.starts_with("Insufficient information"));
        assert!(response.text.contains("From memory: AI is..."));
        assert!(!response.text.contains(COMPLETION_MARKER));
    }

    #[test]
    fn crawl_titles_follow_urls() {
        let mut sources = Vec::new();
        harvest(
            "----------------------------------------\nRESULT 1:\nURL: https://tokio.rs\nTitle: Tokio\nContent: runtime\n",
            &mut sources,
        );
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title.as_deref(), Some("Tokio"));
    }

    #[test]
    fn images_and_failures_are_not_sources() {
        let mut sources = Vec::new();
        harvest(
            "EXTRACT RESULT 1:\nURL: https://a.example\nImages found: 1 images\n  Image 1: https://img.example/1.png\nFAILED EXTRACTIONS:\nFailed 1: https://down.example - 404\n",
            &mut sources,
        );
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://a.example");
    }

    #[test]
    fn sources_are_capped() {
        let state = researched_state("Answer");
        let response = CitationFormatter::new(1).format(&state);
        assert_eq!(response.sources.len(), 1);
        assert!(!response.text.contains("[2]"));
    }

    #[test]
    fn falls_back_to_latest_assistant_text() {
        let mut state = researched_state("RESEARCH_COMPLETE");
        state.messages.pop();
        state.push(Message::assistant(COMPLETION_MARKER));
        let response = CitationFormatter::default().format(&state);
        // the action-request thought is the only text left
        assert!(response.text.starts_with("Searching"));
    }

    #[test]
    fn summary_line_without_any_answer() {
        let mut state = AgentState::new("What is AI?");
        state.append_research("web_search (c1)", "URL: https://a.example");
        state.push(Message::assistant(COMPLETION_MARKER));
        let response = CitationFormatter::default().format(&state);
        assert!(response.text.starts_with("Research findings for \"What is AI?\""));
        assert!(response.text.ends_with("[1] https://a.example"));
    }

    #[test]
    fn longer_urls_cited_before_prefixes() {
        let sources = vec![
            Source {
                url: "https://a.example".into(),
                title: None,
            },
            Source {
                url: "https://a.example/page".into(),
                title: None,
            },
        ];
        assert_eq!(
            cite("see https://a.example/page and https://a.example", &sources),
            "see [2] and [1]"
        );
    }

    #[test]
    fn citations_match_whole_urls_only() {
        let sources = vec![Source {
            url: "https://a.example".into(),
            title: None,
        }];
        let text = cite(
            "See https://a.example, not https://a.example/other.",
            &sources,
        );
        assert_eq!(text, "See [1], not https://a.example/other.");
    }
}
