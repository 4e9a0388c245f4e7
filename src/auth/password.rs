//! bcrypt on the blocking pool; a cost-12 hash takes a few hundred milliseconds.

use crate::error::PanelError;

pub async fn hash_password(password: String, cost: u32) -> Result<String, PanelError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| PanelError::UnexpectedError(format!("hash task failed: {e}")))?
        .map_err(PanelError::from)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, PanelError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| PanelError::UnexpectedError(format!("verify task failed: {e}")))?
        .map_err(PanelError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("s3cret!".to_string(), 4)
            .await
            .expect("hash must succeed");
        assert!(hash.starts_with("$2"));
        assert!(
            verify_password("s3cret!".to_string(), hash.clone())
                .await
                .expect("verify")
        );
        assert!(
            !verify_password("wrong".to_string(), hash)
                .await
                .expect("verify")
        );
    }
}
