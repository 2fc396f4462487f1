//! Account operations.

use super::models::{Player, PlayerId};
use crate::errors::{Entity, StoreResultExt, TourneyError, TourneyResult};
use crate::store::UnitOfWork;

/// Load a player, locking the row for the rest of the unit of work
///
/// # Errors
///
/// * `TourneyError::NotFound` - Unknown player
pub async fn get_player(tx: &mut dyn UnitOfWork, player_id: PlayerId) -> TourneyResult<Player> {
    tx.player_for_update(player_id)
        .await
        .context("load player", Entity::Player(player_id))?
        .ok_or(TourneyError::NotFound(Entity::Player(player_id)))
}

/// Current balance in minor units
///
/// # Errors
///
/// * `TourneyError::NotFound` - Unknown player
pub async fn get_balance(tx: &mut dyn UnitOfWork, player_id: PlayerId) -> TourneyResult<i64> {
    tx.player(player_id)
        .await
        .context("get balance", Entity::Player(player_id))?
        .map(|p| p.balance)
        .ok_or(TourneyError::NotFound(Entity::Player(player_id)))
}

/// Open a zero-balance account
///
/// # Errors
///
/// * `TourneyError::AlreadyExists` - Id taken
pub async fn open_account(
    tx: &mut dyn UnitOfWork,
    player_id: PlayerId,
    display_name: &str,
) -> TourneyResult<Player> {
    let player = Player {
        id: player_id,
        display_name: display_name.to_string(),
        balance: 0,
    };

    let inserted = tx
        .insert_player(&player)
        .await
        .context("open account", Entity::Player(player_id))?;
    if !inserted {
        return Err(TourneyError::AlreadyExists(Entity::Player(player_id)));
    }

    Ok(player)
}

/// Open an account with the default name unless one exists. Returns `true`
/// if a new account was created.
pub async fn ensure_account(tx: &mut dyn UnitOfWork, player_id: PlayerId) -> TourneyResult<bool> {
    let player = Player {
        id: player_id,
        display_name: Player::default_display_name(player_id),
        balance: 0,
    };

    tx.insert_player(&player)
        .await
        .context("ensure account", Entity::Player(player_id))
}

/// Add `amount` minor units to a balance. Returns the new balance.
///
/// # Errors
///
/// * `TourneyError::InvalidAmount` - Negative amount
/// * `TourneyError::NotFound` - Unknown player
/// * `TourneyError::Overflow` - Balance would exceed `i64::MAX`
pub async fn credit(
    tx: &mut dyn UnitOfWork,
    player_id: PlayerId,
    amount: i64,
) -> TourneyResult<i64> {
    if amount < 0 {
        return Err(TourneyError::InvalidAmount(format!(
            "credit of {amount} to player {player_id}"
        )));
    }

    let current = get_player(tx, player_id).await?.balance;
    current
        .checked_add(amount)
        .ok_or(TourneyError::Overflow(Entity::Player(player_id)))?;

    tx.adjust_balance(player_id, amount)
        .await
        .context("credit", Entity::Player(player_id))?
        .ok_or(TourneyError::NotFound(Entity::Player(player_id)))
}

/// Remove `amount` minor units from a balance. Returns the new balance.
///
/// # Errors
///
/// * `TourneyError::InvalidAmount` - Negative amount
/// * `TourneyError::NotFound` - Unknown player
/// * `TourneyError::InsufficientFunds` - Balance lower than `amount`
pub async fn debit(tx: &mut dyn UnitOfWork, player_id: PlayerId, amount: i64) -> TourneyResult<i64> {
    if amount < 0 {
        return Err(TourneyError::InvalidAmount(format!(
            "debit of {amount} from player {player_id}"
        )));
    }

    let updated = tx
        .adjust_balance(player_id, -amount)
        .await
        .context("debit", Entity::Player(player_id))?;

    match updated {
        Some(balance) => Ok(balance),
        None => {
            // Either the player doesn't exist or the guard refused the debit
            let available = get_balance(tx, player_id).await?;
            Err(TourneyError::InsufficientFunds {
                player_id,
                available,
                required: amount,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};

    #[tokio::test]
    async fn test_credit_and_debit_adjust_stored_balance() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        open_account(tx.as_mut(), 1, "alice").await.unwrap();

        assert_eq!(credit(tx.as_mut(), 1, 500).await.unwrap(), 500);
        assert_eq!(debit(tx.as_mut(), 1, 200).await.unwrap(), 300);
        assert_eq!(get_balance(tx.as_mut(), 1).await.unwrap(), 300);
    }

    #[tokio::test]
    async fn test_debit_beyond_balance_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        open_account(tx.as_mut(), 1, "alice").await.unwrap();
        credit(tx.as_mut(), 1, 100).await.unwrap();

        let err = debit(tx.as_mut(), 1, 101).await.unwrap_err();
        assert!(matches!(
            err,
            TourneyError::InsufficientFunds {
                player_id: 1,
                available: 100,
                required: 101
            }
        ));
        assert_eq!(get_balance(tx.as_mut(), 1).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_unknown_player_is_not_found() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        for err in [
            credit(tx.as_mut(), 5, 1).await.unwrap_err(),
            debit(tx.as_mut(), 5, 1).await.unwrap_err(),
            get_balance(tx.as_mut(), 5).await.unwrap_err(),
        ] {
            assert!(matches!(err, TourneyError::NotFound(Entity::Player(5))));
        }
    }

    #[tokio::test]
    async fn test_credit_overflow_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        open_account(tx.as_mut(), 1, "alice").await.unwrap();
        credit(tx.as_mut(), 1, i64::MAX).await.unwrap();

        let err = credit(tx.as_mut(), 1, 1).await.unwrap_err();
        assert!(matches!(err, TourneyError::Overflow(Entity::Player(1))));
    }

    #[tokio::test]
    async fn test_open_account_twice_fails() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        open_account(tx.as_mut(), 1, "alice").await.unwrap();

        let err = open_account(tx.as_mut(), 1, "bob").await.unwrap_err();
        assert!(matches!(err, TourneyError::AlreadyExists(Entity::Player(1))));
        assert!(!ensure_account(tx.as_mut(), 1).await.unwrap());
        assert!(ensure_account(tx.as_mut(), 2).await.unwrap());
    }
}
