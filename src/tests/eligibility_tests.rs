//! tests/eligibility_tests.rs - Eligibility rules and reclaim threshold

#[cfg(test)]
mod tests {
    use crate::blockchain::models::RemoteAccount;
    use crate::models::{AccountStatus, TrackedAccount};
    use crate::reclaim::{Eligibility, EligibilityEvaluator, IneligibleReason};
    use crate::tests::support::{closed_account, live_account, TOKEN_ACCOUNT_LEN, TOKEN_ACCOUNT_RENT};
    use solana_sdk::pubkey::Pubkey;

    fn record_with_status(status: AccountStatus) -> TrackedAccount {
        let mut record = TrackedAccount::new(Pubkey::new_unique().to_string(), 0);
        record.status = status;
        record
    }

    #[test]
    fn test_every_combination_follows_rule_order() {
        let evaluator = EligibilityEvaluator::new(0);

        for exists in [false, true] {
            for closed in [false, true] {
                for funded in [false, true] {
                    for reclaimed in [false, true] {
                        let lamports = if funded { TOKEN_ACCOUNT_RENT } else { 0 };
                        let data_len = if closed { 0 } else { TOKEN_ACCOUNT_LEN };
                        let remote = exists.then(|| RemoteAccount::new(lamports, data_len, spl_token::id()));
                        let status = if reclaimed {
                            AccountStatus::Reclaimed
                        } else {
                            AccountStatus::Active
                        };

                        let expected = if !exists {
                            Eligibility::Ineligible(IneligibleReason::NotFound)
                        } else if !closed {
                            Eligibility::Ineligible(IneligibleReason::NotClosed)
                        } else if !funded {
                            Eligibility::Ineligible(IneligibleReason::ZeroBalance)
                        } else if reclaimed {
                            Eligibility::Ineligible(IneligibleReason::AlreadyReclaimed)
                        } else {
                            Eligibility::Eligible {
                                amount: TOKEN_ACCOUNT_RENT,
                            }
                        };

                        let actual = evaluator.evaluate(remote.as_ref(), &record_with_status(status));
                        assert_eq!(
                            actual, expected,
                            "exists={} closed={} funded={} reclaimed={}",
                            exists, closed, funded, reclaimed
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_eligible_amount_is_current_balance() {
        let evaluator = EligibilityEvaluator::new(1_000_000);
        let result = evaluator.evaluate(Some(&closed_account(5_000)), &record_with_status(AccountStatus::Active));

        // Structural eligibility ignores the threshold
        assert!(result.is_eligible());
        assert_eq!(result.amount(), Some(5_000));
        assert_eq!(result.reason(), None);
    }

    #[test]
    fn test_inactive_records_can_still_be_eligible() {
        let evaluator = EligibilityEvaluator::new(0);
        let result = evaluator.evaluate(
            Some(&closed_account(TOKEN_ACCOUNT_RENT)),
            &record_with_status(AccountStatus::Inactive),
        );
        assert!(result.is_eligible());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let evaluator = EligibilityEvaluator::new(1_000_000);

        assert!(!evaluator.meets_threshold(None));
        assert!(!evaluator.meets_threshold(Some(&closed_account(999_999))));
        assert!(evaluator.meets_threshold(Some(&closed_account(1_000_000))));
        assert!(evaluator.meets_threshold(Some(&live_account(TOKEN_ACCOUNT_RENT))));
        assert_eq!(evaluator.min_reclaim_lamports(), 1_000_000);
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(IneligibleReason::NotFound.to_string(), "not found");
        assert_eq!(IneligibleReason::NotClosed.to_string(), "not closed");
        assert_eq!(IneligibleReason::ZeroBalance.to_string(), "zero balance");
        assert_eq!(IneligibleReason::AlreadyReclaimed.to_string(), "already reclaimed");
    }
}
