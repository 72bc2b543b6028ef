//! `Theme:` directives: ask the model for a change list, run it through the
//! executor, and record what was applied.

use providers::ModelGateway;
use serde_json::Value;
use services::theme_store::ThemeHistoryStore;
use shared::agent_api::ChatMessage;
use shared::error::AssistantError;
use shared::settings::ThemeSettings;
use shared::theme::ThemeResult;
use std::sync::Arc;

use super::executor::{ExecutionReport, SafeMutationExecutor};
use crate::fence::fences;
use crate::intent::strip_directive;
use crate::prompts::theme_preamble;

pub const NO_CHANGES_SUMMARY: &str = "No changes could be derived";

/// What the model's reply amounts to, before anything touches the page.
#[derive(Debug, Clone, PartialEq)]
pub enum ThemePlan {
    Changes(Vec<Value>),
    Empty { error: Option<String> },
}

/// Read the change list out of a reply. Only a ```json fence is accepted.
pub fn extract_plan(reply: &str) -> ThemePlan {
    let blocks = fences(reply);
    let Some(fence) = blocks.iter().find(|f| f.is_json()) else {
        let error = blocks.first().map(|f| {
            format!(
                "The reply contained a `{}` block; only a json change list is applied",
                if f.lang.is_empty() { "plain" } else { f.lang.as_str() }
            )
        });
        return ThemePlan::Empty { error };
    };

    let body = fence.body.trim();
    if body.is_empty() {
        return ThemePlan::Empty { error: None };
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) if items.is_empty() => ThemePlan::Empty { error: None },
        Ok(Value::Array(items)) => ThemePlan::Changes(items),
        Ok(Value::Object(mut obj)) => match obj.remove("changes") {
            Some(Value::Array(items)) if !items.is_empty() => ThemePlan::Changes(items),
            Some(_) => ThemePlan::Empty { error: None },
            None if obj.contains_key("kind") => ThemePlan::Changes(vec![Value::Object(obj)]),
            None => ThemePlan::Empty {
                error: Some("The change list was not a JSON array".into()),
            },
        },
        Ok(_) => ThemePlan::Empty {
            error: Some("The change list was not a JSON array".into()),
        },
        Err(e) => ThemePlan::Empty {
            error: Some(format!("Could not parse the change list: {}", e)),
        },
    }
}

pub struct ThemeDirectiveProcessor {
    gateway: Arc<dyn ModelGateway>,
    executor: Arc<SafeMutationExecutor>,
    store: Arc<ThemeHistoryStore>,
    preamble: String,
}

impl ThemeDirectiveProcessor {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        executor: Arc<SafeMutationExecutor>,
        store: Arc<ThemeHistoryStore>,
        settings: &ThemeSettings,
    ) -> Self {
        Self {
            gateway,
            executor,
            store,
            preamble: theme_preamble(&settings.known_targets, settings.max_changes_per_directive),
        }
    }

    pub fn store(&self) -> &Arc<ThemeHistoryStore> {
        &self.store
    }

    /// Model round trip. Upstream failures propagate; everything else
    /// becomes a plan, possibly empty.
    pub async fn fetch_plan(&self, directive: &str) -> Result<ThemePlan, AssistantError> {
        let request = strip_directive(directive);
        if request.is_empty() {
            return Ok(ThemePlan::Empty {
                error: Some("Describe the change after \"Theme:\"".into()),
            });
        }
        let reply = self
            .gateway
            .complete(&[ChatMessage::user(request)], &self.preamble)
            .await?;
        Ok(extract_plan(&reply))
    }

    /// Run a plan against the page and record applied changes.
    pub fn apply_plan(&self, plan: ThemePlan) -> ThemeResult {
        let items = match plan {
            ThemePlan::Changes(items) => items,
            ThemePlan::Empty { error } => {
                return ThemeResult {
                    summary: NO_CHANGES_SUMMARY.to_string(),
                    errors: error.into_iter().collect(),
                    ..Default::default()
                };
            }
        };

        let report = self.executor.execute(&items);
        let mut result = summarize(report);

        if let Err(e) = self.store.append(&result.changes) {
            tracing::warn!(error = %e, "applied theme changes were not persisted");
            result
                .errors
                .push("Your theme was applied but could not be saved for next time".into());
        }

        tracing::info!(
            applied = result.changes.len(),
            errors = result.errors.len(),
            total = self.store.len(),
            "theme directive processed"
        );
        result
    }

    pub async fn process(&self, directive: &str) -> Result<ThemeResult, AssistantError> {
        let plan = self.fetch_plan(directive).await?;
        Ok(self.apply_plan(plan))
    }

    /// Re-apply the recorded history to a freshly loaded page, without
    /// recording it again.
    pub fn replay(&self) -> ExecutionReport {
        let history = self.store.all();
        if history.is_empty() {
            return ExecutionReport::default();
        }
        let report = self.executor.execute_descriptors(&history);
        if !report.errors.is_empty() {
            tracing::warn!(errors = report.errors.len(), "some saved theme changes no longer apply");
        }
        report
    }
}

fn summarize(report: ExecutionReport) -> ThemeResult {
    let applied = report.applied.len();
    let summary = match (applied, report.errors.len()) {
        (0, 0) if report.notes.is_empty() => NO_CHANGES_SUMMARY.to_string(),
        (0, 0) => "Nothing on the page matched that request".to_string(),
        (0, _) => "None of the changes could be applied".to_string(),
        (n, 0) => format!("Applied {} theme {}", n, plural(n)),
        (n, failed) => format!("Applied {} theme {}, {} failed", n, plural(n), failed),
    };
    ThemeResult {
        summary,
        changes: report.applied,
        descriptions: report.descriptions,
        errors: report.errors,
        notes: report.notes,
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "change"
    } else {
        "changes"
    }
}

/// Transcript text for a theme turn.
pub fn render_result(result: &ThemeResult) -> String {
    let mut text = format!("{}.", result.summary);
    for line in &result.descriptions {
        text.push_str(&format!("\n- {}", line));
    }
    for line in &result.errors {
        text.push_str(&format!("\n- Skipped: {}", line));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use services::page::{ElementSpec, PageDocument};
    use shared::document::{LiveDocument, SharedDocument};
    use shared::theme::{ThemeChangeDescriptor, VisibilityAction};

    /// Replies with a canned answer and remembers what it was asked.
    struct Scripted {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ModelGateway for Scripted {
        async fn complete(
            &self,
            turns: &[ChatMessage],
            _system_preamble: &str,
        ) -> Result<String, AssistantError> {
            self.seen
                .lock()
                .extend(turns.iter().map(|t| t.content.clone()));
            Ok(self.reply.clone())
        }
    }

    struct Down;

    #[async_trait]
    impl ModelGateway for Down {
        async fn complete(&self, _: &[ChatMessage], _: &str) -> Result<String, AssistantError> {
            Err(AssistantError::Upstream {
                status: 503,
                detail: "unavailable".into(),
            })
        }
    }

    fn page() -> Arc<Mutex<PageDocument>> {
        Arc::new(Mutex::new(PageDocument::new(
            ElementSpec::new("body")
                .child(ElementSpec::new("nav").id("navbar"))
                .child(ElementSpec::new("main").id("main-content")),
        )))
    }

    fn processor(gateway: Arc<dyn ModelGateway>, page: &Arc<Mutex<PageDocument>>) -> ThemeDirectiveProcessor {
        let shared: SharedDocument = page.clone();
        ThemeDirectiveProcessor::new(
            gateway,
            Arc::new(SafeMutationExecutor::new(shared)),
            Arc::new(ThemeHistoryStore::in_memory()),
            &ThemeSettings::default(),
        )
    }

    fn scripted(reply: &str) -> Arc<Scripted> {
        Arc::new(Scripted {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_hide_navbar_directive() {
        let page = page();
        let gateway = scripted(
            "```json\n[{\"kind\": \"visibility\", \"selector\": \"#navbar\", \"action\": \"hide\"}]\n```",
        );
        let proc = processor(gateway.clone(), &page);

        let result = proc.process("Theme: hide navbar").await.unwrap();

        assert_eq!(*gateway.seen.lock(), vec!["hide navbar".to_string()]);
        assert_eq!(
            result.changes,
            vec![ThemeChangeDescriptor::Visibility {
                selector: "#navbar".into(),
                action: VisibilityAction::Hide,
            }]
        );
        assert_eq!(result.summary, "Applied 1 theme change");
        assert_eq!(proc.store().len(), 1);

        let page = page.lock();
        let nav = page.select("#navbar").unwrap()[0];
        assert!(!page.is_visible(nav));
    }

    #[tokio::test]
    async fn test_reply_without_fence_changes_nothing() {
        let page = page();
        let proc = processor(scripted("Sure! I made it dark."), &page);
        let before = page.lock().outline();

        let result = proc.process("Theme: dark").await.unwrap();
        assert_eq!(result.summary, NO_CHANGES_SUMMARY);
        assert!(result.changes.is_empty());
        assert!(proc.store().is_empty());
        assert_eq!(page.lock().outline(), before);
    }

    #[tokio::test]
    async fn test_generated_code_is_never_run() {
        let page = page();
        let proc = processor(
            scripted("```js\nfunction applyThemeChanges() { document.body.remove(); }\n```"),
            &page,
        );
        let result = proc.process("Theme: anything").await.unwrap();
        assert!(result.changes.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("`js` block"));
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let page = page();
        let proc = processor(Arc::new(Down), &page);
        let err = proc.process("Theme: dark").await.unwrap_err();
        assert!(matches!(err, AssistantError::Upstream { status: 503, .. }));
        assert!(proc.store().is_empty());
    }

    #[test]
    fn test_extract_plan_shapes() {
        assert_eq!(
            extract_plan("```json\n[]\n```"),
            ThemePlan::Empty { error: None }
        );
        assert!(matches!(
            extract_plan("```json\n{\"changes\": [{\"kind\": \"visibility\"}]}\n```"),
            ThemePlan::Changes(items) if items.len() == 1
        ));
        assert!(matches!(
            extract_plan("```json\n{\"kind\": \"visibility\", \"selector\": \"a\", \"action\": \"hide\"}\n```"),
            ThemePlan::Changes(_)
        ));
        assert!(matches!(
            extract_plan("```json\n[oops\n```"),
            ThemePlan::Empty { error: Some(_) }
        ));
    }

    #[test]
    fn test_replay_restores_after_reload() {
        let page = page();
        let proc = processor(scripted(""), &page);
        let plan = extract_plan(
            "```json\n[{\"kind\": \"style\", \"selector\": \"#main-content\", \"property\": \"color\", \"value\": \"red\"}]\n```",
        );
        proc.apply_plan(plan);
        let themed = page.lock().outline();

        page.lock().reload();
        assert_ne!(page.lock().outline(), themed);

        let report = proc.replay();
        assert_eq!(report.applied.len(), 1);
        assert_eq!(page.lock().outline(), themed);
        assert_eq!(proc.store().len(), 1);
    }

    #[test]
    fn test_render_result() {
        let result = ThemeResult {
            summary: "Applied 1 theme change".into(),
            descriptions: vec!["Hid #navbar".into()],
            errors: vec!["bad".into()],
            ..Default::default()
        };
        assert_eq!(
            render_result(&result),
            "Applied 1 theme change.\n- Hid #navbar\n- Skipped: bad"
        );
    }
}
