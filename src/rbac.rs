use std::collections::{HashMap, HashSet};

/// Resource
///
/// The kinds of entities the authorization engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    User,
    Snippet,
}

/// Action
///
/// The operations a claim may attempt against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Owner-scoped actions are the ones the ownership override applies to.
    /// `Create` has no owner yet, so it is never owner-scoped.
    fn owner_scoped(self) -> bool {
        matches!(self, Action::Read | Action::Update | Action::Delete)
    }
}

/// Decision
///
/// The engine's verdict. There is no third state: anything the policy does
/// not recognize is a `Deny`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Claim
///
/// A verified, request-scoped assertion of caller identity, produced by the
/// token extractor after a fresh user lookup. It is handed to the engine as
/// already-validated input; nothing in this module re-verifies credentials.
#[derive(Debug, Clone)]
pub struct Claim {
    pub user_id: i64,
    pub role: String,
    pub banned: bool,
}

/// ResourceRef
///
/// What a decision is about: a resource kind plus its owner, when one exists.
/// Creation decisions have no owner yet, and some administrative decisions
/// (counting users, flipping ban flags) deliberately omit the owner so the
/// ownership override cannot apply.
#[derive(Debug, Clone, Copy)]
pub struct ResourceRef {
    pub kind: Resource,
    pub owner: Option<i64>,
}

impl ResourceRef {
    pub fn owned(kind: Resource, owner: i64) -> Self {
        Self {
            kind,
            owner: Some(owner),
        }
    }

    pub fn unowned(kind: Resource) -> Self {
        Self { kind, owner: None }
    }
}

/// AccessPolicy
///
/// The role-to-grant table plus the decision function. Built once at process
/// start and shared immutably by every service instance; the same inputs
/// always produce the same decision.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    grants: HashMap<String, HashSet<(Resource, Action)>>,
}

impl AccessPolicy {
    /// Build a policy from explicit role grants.
    pub fn new(grants: HashMap<String, HashSet<(Resource, Action)>>) -> Self {
        Self { grants }
    }

    /// The stock grant table: 'admin' may do everything, 'user' may create
    /// snippets (reading their own is covered by the ownership override),
    /// 'guest' holds no grants at all.
    pub fn defaults() -> Self {
        let mut grants: HashMap<String, HashSet<(Resource, Action)>> = HashMap::new();

        let all: HashSet<(Resource, Action)> = [Resource::User, Resource::Snippet]
            .into_iter()
            .flat_map(|r| {
                [Action::Read, Action::Create, Action::Update, Action::Delete]
                    .into_iter()
                    .map(move |a| (r, a))
            })
            .collect();
        grants.insert("admin".to_string(), all);

        grants.insert(
            "user".to_string(),
            HashSet::from([(Resource::Snippet, Action::Create)]),
        );

        grants.insert("guest".to_string(), HashSet::new());

        Self { grants }
    }

    /// decide
    ///
    /// The pure decision function. Evaluation order:
    ///
    /// 1. A banned claim is denied everything, including its own resources.
    /// 2. A non-banned owner is allowed owner-scoped actions on their own
    ///    resource regardless of role grants.
    /// 3. Otherwise the role's grant set decides; a role the policy does not
    ///    know is a deny, never a crash.
    pub fn decide(&self, claim: &Claim, target: &ResourceRef, action: Action) -> Decision {
        if claim.banned {
            return Decision::Deny;
        }

        if action.owner_scoped() && target.owner == Some(claim.user_id) {
            return Decision::Allow;
        }

        match self.grants.get(&claim.role) {
            Some(granted) if granted.contains(&(target.kind, action)) => Decision::Allow,
            _ => Decision::Deny,
        }
    }

    /// Convenience wrapper for service code: a deny becomes `false`.
    pub fn allows(&self, claim: &Claim, target: &ResourceRef, action: Action) -> bool {
        self.decide(claim, target, action) == Decision::Allow
    }
}
