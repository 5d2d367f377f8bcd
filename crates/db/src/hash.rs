//! Credential hashing strategies.
//!
//! Hashing and comparison run inside the backing store so the lookup and the
//! comparison happen in the same statement. A strategy only contributes fixed
//! SQL fragments; the secret itself is always a bound parameter.

/// Produces the SQL expressions used to store and check a credential.
pub trait CredentialHasher: Send + Sync + 'static {
    /// Expression yielding a freshly salted hash of the secret bound at `$param`.
    fn hash_expr(&self, param: usize) -> String;

    /// Boolean expression that is true when the secret bound at `$param`
    /// matches the hash stored in `column`.
    fn verify_expr(&self, column: &str, param: usize) -> String;
}

/// pgcrypto `crypt()` with a Blowfish salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgCrypto {
    cost: u8,
}

impl PgCrypto {
    /// pgcrypto accepts Blowfish costs between 4 and 31.
    pub fn with_cost(cost: u8) -> Self {
        Self { cost: cost.clamp(4, 31) }
    }

    pub fn cost(&self) -> u8 {
        self.cost
    }
}

impl Default for PgCrypto {
    fn default() -> Self {
        Self::with_cost(8)
    }
}

impl CredentialHasher for PgCrypto {
    fn hash_expr(&self, param: usize) -> String {
        format!("crypt(${param}, gen_salt('bf', {}))", self.cost)
    }

    fn verify_expr(&self, column: &str, param: usize) -> String {
        format!("{column} = crypt(${param}, {column})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_uses_a_fresh_salt_per_call() {
        let hasher = PgCrypto::default();
        assert_eq!(hasher.hash_expr(3), "crypt($3, gen_salt('bf', 8))");
    }

    #[test]
    fn verify_reuses_the_stored_salt() {
        let hasher = PgCrypto::default();
        assert_eq!(
            hasher.verify_expr("contrasena_hash", 2),
            "contrasena_hash = crypt($2, contrasena_hash)"
        );
    }

    #[test]
    fn cost_is_clamped_to_the_pgcrypto_range() {
        assert_eq!(PgCrypto::with_cost(1).cost(), 4);
        assert_eq!(PgCrypto::with_cost(40).cost(), 31);
        assert_eq!(PgCrypto::with_cost(12).cost(), 12);
    }
}
