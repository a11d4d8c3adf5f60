use crate::model::Transaction;

/// Session copy of the user's transactions.
///
/// Single owner; consumers get read-only slices. All mutation goes through
/// `created` / `updated` / `deleted`, each of which builds the next list and
/// swaps it in whole.
#[derive(Debug, Clone, Default)]
pub struct TransactionCache {
    items: Vec<Transaction>,
}

impl TransactionCache {
    pub fn new(items: Vec<Transaction>) -> Self {
        Self { items }
    }

    pub fn as_slice(&self) -> &[Transaction] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Transaction> {
        self.items.iter().find(|t| t.id == id)
    }

    pub fn replace_all(&mut self, items: Vec<Transaction>) {
        self.items = items;
    }

    /// Newly created entries go first.
    pub fn created(&mut self, tx: Transaction) {
        let next: Vec<Transaction> = std::iter::once(tx)
            .chain(self.items.iter().cloned())
            .collect();
        self.items = next;
    }

    /// Replace by id. An unknown id is treated as a create.
    pub fn updated(&mut self, tx: Transaction) {
        if self.get(tx.id).is_none() {
            self.created(tx);
            return;
        }
        let next: Vec<Transaction> = self
            .items
            .iter()
            .map(|t| if t.id == tx.id { tx.clone() } else { t.clone() })
            .collect();
        self.items = next;
    }

    pub fn deleted(&mut self, id: i64) {
        let next: Vec<Transaction> = self.items.iter().filter(|t| t.id != id).cloned().collect();
        self.items = next;
    }
}
