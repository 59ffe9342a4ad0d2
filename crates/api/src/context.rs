use curvebook_core::AccountId;

/// Caller identity for a request.
///
/// Taken from the `x-account-id` header; present on every mutating route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallerContext {
    account: AccountId,
}

impl CallerContext {
    pub fn new(account: AccountId) -> Self {
        Self { account }
    }

    pub fn account(&self) -> AccountId {
        self.account
    }
}
