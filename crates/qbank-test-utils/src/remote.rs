//! In-memory [`Remote`] with scripted failures.
//!
//! `MockRemote` behaves like a small question bank for one scope: it lists,
//! fetches, creates, updates and deletes questions, and records every call
//! so tests can assert on traffic. Failures are switched on per operation.
//! A fetched question declares only its own category, as a single-question
//! export from the server does.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use qbank_core::category::in_scope;
use qbank_core::{
    CategoryDecl, ContentRef, FetchedEntity, PushOutcome, PushRequest, Remote, RemoteEntity,
    RemoteError, Response, Scope, ScopeFilter, Version,
};

/// A question held by [`MockRemote`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockQuestion {
    pub entity_id: String,
    pub name: String,
    pub category_path: String,
    pub version: u64,
    pub payload: String,
    pub scope: Scope,
}

#[derive(Default)]
struct State {
    questions: Vec<MockQuestion>,
    next_id: u64,
    uploads: HashMap<String, String>,
    next_upload: u64,
    categories: Vec<String>,
    calls: Vec<String>,
    /// Questions hidden from scope listings but found by id lookup
    moved: HashSet<String>,
    fail_listing: bool,
    fail_lookup: bool,
    failing_fetches: HashSet<String>,
    failing_categories: HashSet<String>,
    rejected_content: Vec<String>,
    declined_deletes: HashSet<String>,
}

/// In-memory question bank for one scope
pub struct MockRemote {
    scope: Scope,
    state: RefCell<State>,
}

/// Content the mock serves for a question
pub fn question_payload(name: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<quiz>\n  <question type=\"multichoice\">\n    \
         <name><text>{name}</text></name>\n    <questiontext><text>{body}</text></questiontext>\n  \
         </question>\n</quiz>\n"
    )
}

impl MockRemote {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            state: RefCell::new(State {
                next_id: 1,
                next_upload: 1,
                ..State::default()
            }),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Add a question at version 1 and return its id.
    pub fn add_question(&self, name: &str, category_path: &str) -> String {
        self.add_question_with(name, category_path, &question_payload(name, "What is it?"))
    }

    /// Add a question with explicit content and return its id.
    pub fn add_question_with(&self, name: &str, category_path: &str, payload: &str) -> String {
        let mut state = self.state.borrow_mut();
        let entity_id = state.next_id.to_string();
        state.next_id += 1;
        state.questions.push(MockQuestion {
            entity_id: entity_id.clone(),
            name: name.to_string(),
            category_path: category_path.to_string(),
            version: 1,
            payload: payload.to_string(),
            scope: self.scope.clone(),
        });
        entity_id
    }

    /// Simulate an edit made on the server.
    pub fn edit_remotely(&self, entity_id: &str, payload: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(q) = state.questions.iter_mut().find(|q| q.entity_id == entity_id) {
            q.version += 1;
            q.payload = payload.to_string();
        }
    }

    /// Delete a question on the server side.
    pub fn remove_question(&self, entity_id: &str) {
        self.state
            .borrow_mut()
            .questions
            .retain(|q| q.entity_id != entity_id);
    }

    /// Hide a question from scope listings while id lookups still find it.
    pub fn move_out_of_listing(&self, entity_id: &str) {
        self.state.borrow_mut().moved.insert(entity_id.to_string());
    }

    pub fn fail_listing(&self) {
        self.state.borrow_mut().fail_listing = true;
    }

    pub fn fail_lookup(&self) {
        self.state.borrow_mut().fail_lookup = true;
    }

    pub fn fail_fetch(&self, entity_id: &str) {
        self.state
            .borrow_mut()
            .failing_fetches
            .insert(entity_id.to_string());
    }

    pub fn fail_category(&self, category_path: &str) {
        self.state
            .borrow_mut()
            .failing_categories
            .insert(category_path.to_string());
    }

    /// Reject pushes of uploaded content containing `needle`.
    pub fn reject_content_containing(&self, needle: &str) {
        self.state
            .borrow_mut()
            .rejected_content
            .push(needle.to_string());
    }

    pub fn decline_delete(&self, entity_id: &str) {
        self.state
            .borrow_mut()
            .declined_deletes
            .insert(entity_id.to_string());
    }

    pub fn question(&self, entity_id: &str) -> Option<MockQuestion> {
        self.state
            .borrow()
            .questions
            .iter()
            .find(|q| q.entity_id == entity_id)
            .cloned()
    }

    pub fn questions(&self) -> Vec<MockQuestion> {
        self.state.borrow().questions.clone()
    }

    /// Categories created through `ensure_category`, in call order.
    pub fn categories(&self) -> Vec<String> {
        self.state.borrow().categories.clone()
    }

    /// Every call made so far, such as `fetch:3` or `push:new`.
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Number of calls whose label starts with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }

    fn listed(q: &MockQuestion) -> RemoteEntity {
        RemoteEntity {
            entity_id: q.entity_id.clone(),
            name: q.name.clone(),
            category_path: q.category_path.clone(),
            version: Version::from(q.version),
            context: Some(q.scope.clone()),
        }
    }
}

impl Remote for MockRemote {
    fn list(&self, filter: &ScopeFilter) -> Response<Vec<RemoteEntity>> {
        if !filter.entity_ids.is_empty() {
            self.record(format!("lookup:{}", filter.entity_ids.join(",")));
            let state = self.state.borrow();
            if state.fail_lookup {
                return Err(RemoteError::exception("Lookup unavailable"));
            }
            return Ok(state
                .questions
                .iter()
                .filter(|q| filter.entity_ids.contains(&q.entity_id))
                .map(Self::listed)
                .collect());
        }

        self.record(format!("list:{}", filter.category.as_deref().unwrap_or("*")));
        let state = self.state.borrow();
        if state.fail_listing {
            return Err(RemoteError::malformed("invalid JSON: expected value at line 1"));
        }
        Ok(state
            .questions
            .iter()
            .filter(|q| q.scope == filter.scope && !state.moved.contains(&q.entity_id))
            .filter(|q| in_scope(&q.category_path, filter.category.as_deref()))
            .map(Self::listed)
            .collect())
    }

    fn fetch(&self, entity_id: &str, include_category: bool) -> Response<FetchedEntity> {
        self.record(format!("fetch:{entity_id}"));
        let state = self.state.borrow();
        if state.failing_fetches.contains(entity_id) {
            return Err(RemoteError::Exception {
                exception: Some("moodle_exception".to_string()),
                message: "Question export failed".to_string(),
                debuginfo: Some(format!("entry {entity_id}")),
            });
        }
        let q = state
            .questions
            .iter()
            .find(|q| q.entity_id == entity_id)
            .ok_or_else(|| RemoteError::exception("Question not found"))?;

        Ok(FetchedEntity {
            version: Version::from(q.version),
            category_chain: if include_category {
                vec![CategoryDecl::new(q.category_path.clone())]
            } else {
                Vec::new()
            },
            payload: q.payload.clone(),
        })
    }

    fn ensure_category(&self, _scope: &Scope, category_path: &str) -> Response<()> {
        self.record(format!("category:{category_path}"));
        let mut state = self.state.borrow_mut();
        if state.failing_categories.contains(category_path) {
            return Err(RemoteError::malformed("invalid JSON: <html>"));
        }
        if !state.categories.iter().any(|c| c == category_path) {
            state.categories.push(category_path.to_string());
        }
        Ok(())
    }

    fn upload(&self, file: &Path) -> Response<ContentRef> {
        self.record("upload".to_string());
        let content = std::fs::read_to_string(file)?;
        let mut state = self.state.borrow_mut();
        let item = state.next_upload.to_string();
        state.next_upload += 1;
        state.uploads.insert(item.clone(), content);
        Ok(ContentRef(item))
    }

    fn push(&self, request: &PushRequest) -> Response<PushOutcome> {
        self.record(format!(
            "push:{}",
            request.entity_id.as_deref().unwrap_or("new")
        ));
        let mut state = self.state.borrow_mut();
        let content = state
            .uploads
            .get(&request.content.0)
            .cloned()
            .ok_or_else(|| RemoteError::malformed("unknown file item"))?;
        if state.rejected_content.iter().any(|n| content.contains(n.as_str())) {
            return Err(RemoteError::exception("Question rejected"));
        }

        match &request.entity_id {
            Some(id) => {
                let q = state
                    .questions
                    .iter_mut()
                    .find(|q| &q.entity_id == id)
                    .ok_or_else(|| RemoteError::exception("Question not found"))?;
                q.version += 1;
                q.payload = content;
                q.category_path = request.category_path.clone();
                Ok(PushOutcome {
                    entity_id: q.entity_id.clone(),
                    version: Version::from(q.version),
                })
            }
            None => {
                let entity_id = state.next_id.to_string();
                state.next_id += 1;
                state.questions.push(MockQuestion {
                    entity_id: entity_id.clone(),
                    name: format!("Imported {entity_id}"),
                    category_path: request.category_path.clone(),
                    version: 1,
                    payload: content,
                    scope: request.scope.clone(),
                });
                Ok(PushOutcome {
                    entity_id,
                    version: Version::from(1),
                })
            }
        }
    }

    fn delete(&self, entity_id: &str) -> Response<bool> {
        self.record(format!("delete:{entity_id}"));
        let mut state = self.state.borrow_mut();
        if state.declined_deletes.contains(entity_id) {
            return Ok(false);
        }
        let before = state.questions.len();
        state.questions.retain(|q| q.entity_id != entity_id);
        Ok(state.questions.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_respects_category_and_moves() {
        let remote = MockRemote::new(Scope::course("C"));
        let a = remote.add_question("a", "top/A");
        let b = remote.add_question("b", "top/A2");
        remote.move_out_of_listing(&b);

        let listed = remote
            .list(&ScopeFilter::category(remote.scope(), Some("top/A")))
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].entity_id, a);

        let whole = remote.list(&ScopeFilter::whole(remote.scope())).unwrap();
        assert_eq!(whole.len(), 1);

        let found = remote
            .list(&ScopeFilter::entities(remote.scope(), vec![b.clone()]))
            .unwrap();
        assert_eq!(found[0].entity_id, b);
    }
}
