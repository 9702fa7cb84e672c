//! # dq-verify — The "Law" of TABQUERY
//!
//! Kani proofs for the active-tab pointer. `cargo kani -p dq-verify` runs
//! them; `cargo test` runs a bounded exhaustive twin of each property so the
//! guarantees are also checked where Kani is not installed.
//!
//! # Proof: Pointer Stays in Bounds
//!
//! For any session of `n` tabs with a valid active index, closing any tab
//! leaves the active index inside the remaining `n - 1` tabs (or at 0 when
//! none remain).
//!
//! # Proof: Active Tab Survives Unrelated Closes
//!
//! Closing a tab other than the active one never changes which tab is
//! active.

extern crate dq_core;

use dq_core::session::active_after_close;

/// Index of the active tab after closing `closed` in a strip of `len` tabs,
/// or `None` when `closed` is out of range.
pub fn close_in_strip(len: usize, active: usize, closed: usize) -> Option<usize> {
    if closed >= len {
        return None;
    }
    if len == 1 {
        return Some(0);
    }
    Some(active_after_close(active, closed))
}

#[cfg(kani)]
mod proofs {
    use super::*;

    const MAX_TABS: usize = 64;

    /// **Proof: Bounds**
    ///
    /// Any strip length, any valid active index, any valid closed index.
    #[kani::proof]
    fn verify_active_stays_in_bounds() {
        let len: usize = kani::any();
        let active: usize = kani::any();
        let closed: usize = kani::any();
        kani::assume(len > 0 && len <= MAX_TABS);
        kani::assume(active < len);
        kani::assume(closed < len);

        let next = close_in_strip(len, active, closed).unwrap();
        if len == 1 {
            assert!(next == 0);
        } else {
            assert!(next < len - 1, "active index past the end after close");
        }
    }

    /// **Proof: Identity**
    ///
    /// Tab `active` sits at `active_after_close(active, closed)` once tab
    /// `closed != active` is removed.
    #[kani::proof]
    fn verify_active_identity_preserved() {
        let len: usize = kani::any();
        let active: usize = kani::any();
        let closed: usize = kani::any();
        kani::assume(len > 1 && len <= MAX_TABS);
        kani::assume(active < len && closed < len && closed != active);

        let next = close_in_strip(len, active, closed).unwrap();
        // Position of the old active tab after `Vec::remove(closed)`.
        let shifted = if closed < active { active - 1 } else { active };
        assert!(next == shifted);
    }

    /// **Proof: Left Neighbour**
    ///
    /// Closing the active tab selects the tab that was to its left.
    #[kani::proof]
    fn verify_closing_active_selects_left() {
        let len: usize = kani::any();
        let active: usize = kani::any();
        kani::assume(len > 1 && len <= MAX_TABS);
        kani::assume(active < len);

        let next = close_in_strip(len, active, active).unwrap();
        assert!(next == active.saturating_sub(1));
    }
}
