//! Filament inventory ledger: append/delete-only signed movements.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use printworks_core::{
    DecimalColumn, DomainError, DomainResult, Entity, FilamentId, FilamentTransactionId,
    PrintJobId,
};

/// Ledger movement kind.
///
/// `in` and `adjustment` add to stock, `out` and `waste` remove from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    In,
    Out,
    Adjustment,
    Waste,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 4] = [
        TransactionKind::In,
        TransactionKind::Out,
        TransactionKind::Adjustment,
        TransactionKind::Waste,
    ];

    pub fn is_inbound(self) -> bool {
        matches!(self, TransactionKind::In | TransactionKind::Adjustment)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::In => "in",
            TransactionKind::Out => "out",
            TransactionKind::Adjustment => "adjustment",
            TransactionKind::Waste => "waste",
        }
    }
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(TransactionKind::In),
            "out" => Ok(TransactionKind::Out),
            "adjustment" => Ok(TransactionKind::Adjustment),
            "waste" => Ok(TransactionKind::Waste),
            other => Err(DomainError::validation(
                "kind",
                format!("unknown transaction kind '{other}'"),
            )),
        }
    }
}

/// One ledger row.
///
/// `previous_stock` / `new_stock` are informational snapshots taken when the
/// row was recorded; the authoritative stock is always the ledger sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilamentTransaction {
    pub id: FilamentTransactionId,
    pub filament_id: FilamentId,
    pub kind: TransactionKind,
    pub quantity_grams: Decimal,
    pub print_job_id: Option<PrintJobId>,
    pub previous_stock: Option<Decimal>,
    pub new_stock: Option<Decimal>,
    pub reason: String,
    pub notes: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for FilamentTransaction {
    type Id = FilamentTransactionId;

    fn id(&self) -> FilamentTransactionId {
        self.id
    }
}

impl FilamentTransaction {
    /// Quantity with the sign the kind applies to stock.
    pub fn signed_quantity(&self) -> Decimal {
        if self.kind.is_inbound() {
            self.quantity_grams
        } else {
            -self.quantity_grams
        }
    }
}

/// Command: RecordLedgerTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLedgerTransaction {
    pub transaction_id: FilamentTransactionId,
    pub filament_id: FilamentId,
    pub kind: TransactionKind,
    pub quantity_grams: Decimal,
    pub print_job_id: Option<PrintJobId>,
    pub reason: String,
    pub notes: String,
    pub created_by: String,
    pub occurred_at: DateTime<Utc>,
}

impl RecordLedgerTransaction {
    /// Minimal command for a movement with no job link or annotations.
    pub fn new(
        filament_id: FilamentId,
        kind: TransactionKind,
        quantity_grams: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: FilamentTransactionId::new(),
            filament_id,
            kind,
            quantity_grams,
            print_job_id: None,
            reason: String::new(),
            notes: String::new(),
            created_by: String::new(),
            occurred_at,
        }
    }
}

impl FilamentTransaction {
    /// Validate the command and build the ledger row (snapshots unset).
    pub fn record(cmd: &RecordLedgerTransaction) -> DomainResult<Self> {
        if cmd.quantity_grams <= Decimal::ZERO {
            return Err(DomainError::validation("quantity_grams", "quantity must be > 0"));
        }
        DecimalColumn::QUANTITY.check("quantity_grams", cmd.quantity_grams)?;

        Ok(Self {
            id: cmd.transaction_id,
            filament_id: cmd.filament_id,
            kind: cmd.kind,
            quantity_grams: cmd.quantity_grams,
            print_job_id: cmd.print_job_id,
            previous_stock: None,
            new_stock: None,
            reason: cmd.reason.clone(),
            notes: cmd.notes.clone(),
            created_by: cmd.created_by.clone(),
            created_at: cmd.occurred_at,
        })
    }
}

/// Per-direction sums over a filament's full ledger.
///
/// Stores aggregate these with one indexed query keyed by filament; the
/// in-memory path folds rows with [`LedgerTotals::from_transactions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    /// Σ quantity over `in` + `adjustment`.
    pub inbound: Decimal,
    /// Σ quantity over `out` + `waste`.
    pub outbound: Decimal,
}

impl LedgerTotals {
    pub fn from_transactions<'a>(
        rows: impl IntoIterator<Item = &'a FilamentTransaction>,
    ) -> DomainResult<Self> {
        rows.into_iter().try_fold(Self::default(), |mut acc, row| {
            acc.add(row.kind, row.quantity_grams)?;
            Ok(acc)
        })
    }

    pub fn add(&mut self, kind: TransactionKind, quantity_grams: Decimal) -> DomainResult<()> {
        let side = if kind.is_inbound() {
            &mut self.inbound
        } else {
            &mut self.outbound
        };
        *side = side
            .checked_add(quantity_grams)
            .ok_or_else(|| DomainError::validation("quantity_grams", "ledger sum overflows"))?;
        Ok(())
    }

    /// Current stock: Σ(in, adjustment) − Σ(out, waste). Empty ledger is zero.
    pub fn stock(&self) -> Decimal {
        self.inbound - self.outbound
    }

    /// [`stock`](Self::stock), rejected when the stock column cannot hold it.
    pub fn checked_stock(&self) -> DomainResult<Decimal> {
        let stock = self
            .inbound
            .checked_sub(self.outbound)
            .ok_or_else(|| DomainError::validation("quantity_grams", "ledger sum overflows"))?;
        DecimalColumn::QUANTITY.check("quantity_grams", stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn row(kind: TransactionKind, qty: Decimal) -> FilamentTransaction {
        FilamentTransaction::record(&RecordLedgerTransaction::new(
            FilamentId::new(),
            kind,
            qty,
            Utc::now(),
        ))
        .unwrap()
    }

    #[test]
    fn empty_ledger_is_zero() {
        let rows: Vec<FilamentTransaction> = Vec::new();
        let totals = LedgerTotals::from_transactions(&rows).unwrap();
        assert_eq!(totals.stock(), Decimal::ZERO);
    }

    #[test]
    fn stock_is_inbound_minus_outbound() {
        let rows = vec![
            row(TransactionKind::In, dec!(1000)),
            row(TransactionKind::Adjustment, dec!(12.5)),
            row(TransactionKind::Out, dec!(230.25)),
            row(TransactionKind::Waste, dec!(7.125)),
        ];
        let totals = LedgerTotals::from_transactions(&rows).unwrap();
        assert_eq!(totals.inbound, dec!(1012.5));
        assert_eq!(totals.outbound, dec!(237.375));
        assert_eq!(totals.stock(), dec!(775.125));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let cmd = RecordLedgerTransaction::new(
            FilamentId::new(),
            TransactionKind::In,
            Decimal::ZERO,
            Utc::now(),
        );
        let err = FilamentTransaction::record(&cmd).unwrap_err();
        assert_eq!(err.field(), Some("quantity_grams"));
    }

    #[test]
    fn negative_quantity_is_rejected_even_for_adjustments() {
        let cmd = RecordLedgerTransaction::new(
            FilamentId::new(),
            TransactionKind::Adjustment,
            dec!(-5),
            Utc::now(),
        );
        assert!(FilamentTransaction::record(&cmd).is_err());
    }

    #[test]
    fn quantity_beyond_column_precision_is_rejected() {
        for qty in [dec!(0.0001), dec!(1.2345), dec!(1000000000), Decimal::MAX] {
            let cmd =
                RecordLedgerTransaction::new(FilamentId::new(), TransactionKind::In, qty, Utc::now());
            let err = FilamentTransaction::record(&cmd).unwrap_err();
            assert_eq!(err.field(), Some("quantity_grams"), "{qty}");
        }
    }

    #[test]
    fn overflowing_totals_error_instead_of_panicking() {
        let mut totals = LedgerTotals::default();
        totals.add(TransactionKind::In, Decimal::MAX).unwrap();
        let err = totals.add(TransactionKind::Adjustment, Decimal::MAX).unwrap_err();
        assert_eq!(err.field(), Some("quantity_grams"));
    }

    #[test]
    fn stock_beyond_column_is_rejected() {
        let totals = LedgerTotals {
            inbound: dec!(999999999.999),
            outbound: Decimal::ZERO,
        };
        assert_eq!(totals.checked_stock().unwrap(), dec!(999999999.999));

        let totals = LedgerTotals {
            inbound: dec!(999999999.999),
            outbound: dec!(-1),
        };
        assert!(totals.checked_stock().is_err());
    }

    #[test]
    fn kind_parses_its_own_display() {
        for kind in TransactionKind::ALL {
            assert_eq!(kind.to_string().parse::<TransactionKind>().unwrap(), kind);
        }
        assert!("refund".parse::<TransactionKind>().is_err());
    }

    fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
        prop::sample::select(TransactionKind::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the ledger sum equals the sum of signed quantities and
        /// does not depend on row order.
        #[test]
        fn stock_matches_signed_sum_in_any_order(
            moves in prop::collection::vec((kind_strategy(), 1i64..5_000_000i64), 0..40)
        ) {
            let rows: Vec<_> = moves
                .iter()
                .map(|(kind, milligrams)| row(*kind, Decimal::new(*milligrams, 3)))
                .collect();

            let expected: Decimal = rows.iter().map(|r| r.signed_quantity()).sum();
            let forward = LedgerTotals::from_transactions(&rows).unwrap();
            let backward = LedgerTotals::from_transactions(rows.iter().rev()).unwrap();

            prop_assert_eq!(forward.stock(), expected);
            prop_assert_eq!(backward.stock(), expected);
        }
    }
}
