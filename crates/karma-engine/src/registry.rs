use im::{HashMap, Vector};
use karma_types::models::{User, UserInfo};

/// Known users and their reputation scores, in registration order.
///
/// Backed by persistent collections: a clone shares storage with the
/// original, and a later write copies only the path it touches. A clone
/// handed to another task is a stable read-only snapshot.
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
    users: Vector<User>,
    /// stable id -> position in `users`
    by_id: HashMap<String, usize>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn users(&self) -> &Vector<User> {
        &self.users
    }

    /// Insert with score 0. Returns false if the id is already registered.
    pub fn register(&mut self, info: UserInfo) -> bool {
        if self.by_id.contains_key(&info.id) {
            return false;
        }
        let idx = self.users.len();
        self.by_id.insert(info.id.clone(), idx);
        self.users.push_back(User::new(info));
        true
    }

    /// Apply `delta` to the user with this stable id. Unknown ids are ignored.
    pub fn adjust(&mut self, id: &str, delta: i64) -> bool {
        let Some(user) = self.by_id.get(id).and_then(|&idx| self.users.get_mut(idx)) else {
            return false;
        };
        user.score += delta;
        true
    }

    /// Resolve by stable id, then handle, then display name.
    pub fn find(&self, identity: &str) -> Option<&User> {
        if let Some(user) = self.by_id.get(identity).and_then(|&idx| self.users.get(idx)) {
            return Some(user);
        }
        self.users
            .iter()
            .find(|u| u.info.name == identity)
            .or_else(|| self.users.iter().find(|u| u.info.real_name == identity))
    }

    /// Like [`find`](Self::find), but a miss yields the empty placeholder user.
    pub fn find_or_placeholder(&self, identity: &str) -> User {
        self.find(identity).cloned().unwrap_or_default()
    }

    /// Arithmetic mean of all scores, `None` when no users are registered.
    pub fn mean_score(&self) -> Option<f64> {
        if self.users.is_empty() {
            return None;
        }
        let sum: i64 = self.users.iter().map(|u| u.score).sum();
        Some(sum as f64 / self.users.len() as f64)
    }

    /// Highest score first; equal scores keep registration order.
    pub fn ranked_descending(&self) -> Vec<User> {
        let mut ranked: Vec<User> = self.users.iter().cloned().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, name: &str, real_name: &str) -> UserInfo {
        UserInfo {
            id: id.into(),
            name: name.into(),
            real_name: real_name.into(),
        }
    }

    fn seeded(scores: &[i64]) -> UserRegistry {
        let mut reg = UserRegistry::new();
        for (i, score) in scores.iter().enumerate() {
            let id = format!("U{}", i);
            reg.register(info(&id, &id.to_lowercase(), &format!("User {}", i)));
            reg.adjust(&id, *score);
        }
        reg
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut reg = UserRegistry::new();
        assert!(reg.register(info("U1", "karam", "Karam K.")));
        reg.adjust("U1", 3);
        assert!(!reg.register(info("U1", "other", "Other")));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.find("U1").unwrap().score, 3);
        assert_eq!(reg.find("U1").unwrap().info.name, "karam");
    }

    #[test]
    fn test_adjust_unknown_is_noop() {
        let mut reg = seeded(&[1]);
        assert!(!reg.adjust("nobody", 5));
        assert_eq!(reg.users()[0].score, 1);
    }

    #[test]
    fn test_find_by_every_identity() {
        let mut reg = UserRegistry::new();
        reg.register(info("U0", "someone", "Someone Else"));
        reg.register(info("U1", "karam", "Karam K."));

        let by_id = reg.find("U1").unwrap();
        let by_handle = reg.find("karam").unwrap();
        let by_name = reg.find("Karam K.").unwrap();
        assert_eq!(by_id, by_handle);
        assert_eq!(by_id, by_name);
        assert_eq!(by_id.info.id, "U1");

        assert!(reg.find("nobody").is_none());
        assert!(reg.find_or_placeholder("nobody").is_placeholder());
    }

    #[test]
    fn test_find_prefers_id_over_handle() {
        let mut reg = UserRegistry::new();
        reg.register(info("U1", "U2", "First"));
        reg.register(info("U2", "second", "Second"));
        assert_eq!(reg.find("U2").unwrap().info.real_name, "Second");
    }

    #[test]
    fn test_mean_score() {
        assert_eq!(seeded(&[2, 4, 6]).mean_score(), Some(4.0));
        assert_eq!(UserRegistry::new().mean_score(), None);
    }

    #[test]
    fn test_ranked_descending_is_stable() {
        let reg = seeded(&[1, 5, 1, 5, 0]);
        let ids: Vec<_> = reg
            .ranked_descending()
            .into_iter()
            .map(|u| u.info.id)
            .collect();
        assert_eq!(ids, vec!["U1", "U3", "U0", "U2", "U4"]);
    }

    #[test]
    fn test_snapshot_unaffected_by_later_writes() {
        let mut reg = seeded(&[0]);
        let snapshot = reg.clone();
        reg.adjust("U0", 10);
        assert_eq!(snapshot.users()[0].score, 0);
        assert_eq!(reg.users()[0].score, 10);
    }

    #[test]
    fn test_clone_shares_storage() {
        let mut reg = UserRegistry::new();
        for i in 0..1_000 {
            let id = format!("U{}", i);
            reg.register(info(&id, &id, &id));
        }

        let snapshot = reg.clone();
        assert!(snapshot.users().ptr_eq(reg.users()));

        reg.adjust("U500", 2);
        assert_eq!(snapshot.find("U500").unwrap().score, 0);
        assert_eq!(reg.find("U500").unwrap().score, 2);
    }
}
