//! Follow / friend-request mutations.
//!
//! Every operation validates the current relationship state and applies its
//! writes inside one transaction, so two racing requests against the same
//! pair of users cannot double-append or lose an update — the second caller
//! observes the first caller's committed state and fails the precondition
//! check instead.

use rusqlite::Transaction;

use crate::Database;
use crate::error::StoreError;

impl Database {
    /// Record that `actor` follows `target`.
    pub fn follow(&self, actor: &str, target: &str) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            ensure_user(tx, target)?;
            ensure_user(tx, actor)?;

            if is_following(tx, actor, target)? {
                return Err(StoreError::AlreadyFollowing);
            }

            tx.execute(
                "INSERT INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
                (actor, target),
            )?;
            Ok(())
        })
    }

    pub fn unfollow(&self, actor: &str, target: &str) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            ensure_user(tx, target)?;
            ensure_user(tx, actor)?;

            let removed = tx.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                (actor, target),
            )?;
            if removed == 0 {
                return Err(StoreError::NotFollowing);
            }
            Ok(())
        })
    }

    /// Send a friend request from `actor` to `target`. A request also
    /// establishes a follow from `actor` to `target` (deliberate coupling
    /// carried over from the original product behavior).
    pub fn send_friend_request(&self, actor: &str, target: &str) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            ensure_user(tx, target)?;
            ensure_user(tx, actor)?;

            if has_request(tx, target, actor)? {
                return Err(StoreError::AlreadyRequested);
            }

            tx.execute(
                "INSERT INTO friend_requests (recipient_id, requester_id) VALUES (?1, ?2)",
                (target, actor),
            )?;
            // Set-union semantics: the actor may already follow the target.
            tx.execute(
                "INSERT OR IGNORE INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
                (actor, target),
            )?;
            Ok(())
        })
    }

    /// Accept a pending request from `requester`; both users become friends.
    pub fn accept_friend_request(&self, actor: &str, requester: &str) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            ensure_user(tx, requester)?;
            ensure_user(tx, actor)?;

            let removed = tx.execute(
                "DELETE FROM friend_requests WHERE recipient_id = ?1 AND requester_id = ?2",
                (actor, requester),
            )?;
            if removed == 0 {
                return Err(StoreError::NoSuchRequest);
            }

            tx.execute(
                "INSERT OR IGNORE INTO friends (user_id, friend_id) VALUES (?1, ?2)",
                (actor, requester),
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO friends (user_id, friend_id) VALUES (?1, ?2)",
                (requester, actor),
            )?;
            Ok(())
        })
    }

    /// Decline a pending request and undo the follow the request created.
    pub fn decline_friend_request(&self, actor: &str, requester: &str) -> Result<(), StoreError> {
        self.with_tx(|tx| {
            ensure_user(tx, requester)?;
            ensure_user(tx, actor)?;

            let removed = tx.execute(
                "DELETE FROM friend_requests WHERE recipient_id = ?1 AND requester_id = ?2",
                (actor, requester),
            )?;
            if removed == 0 {
                return Err(StoreError::NoSuchRequest);
            }

            tx.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                (requester, actor),
            )?;
            Ok(())
        })
    }
}

fn ensure_user(tx: &Transaction, id: &str) -> Result<(), StoreError> {
    let exists = tx
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |_| Ok(()))
        .map(|_| true)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(false),
            e => Err(e),
        })?;

    if exists { Ok(()) } else { Err(StoreError::UserNotFound) }
}

fn is_following(tx: &Transaction, actor: &str, target: &str) -> Result<bool, StoreError> {
    exists(
        tx,
        "SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
        actor,
        target,
    )
}

fn has_request(tx: &Transaction, recipient: &str, requester: &str) -> Result<bool, StoreError> {
    exists(
        tx,
        "SELECT 1 FROM friend_requests WHERE recipient_id = ?1 AND requester_id = ?2",
        recipient,
        requester,
    )
}

fn exists(tx: &Transaction, sql: &str, a: &str, b: &str) -> Result<bool, StoreError> {
    tx.query_row(sql, (a, b), |_| Ok(()))
        .map(|_| true)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(false),
            e => Err(e.into()),
        })
}
