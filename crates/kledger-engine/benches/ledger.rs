//! KLedger benchmarks
//!
//! - Rate model math (previews, stake accrual)
//! - Loan request/approve/repay round trip
//! - Stake open/read/withdraw round trip

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kledger_common::{
    AccountId, Amount, AssetId, InMemoryTokenService, ManualClock, NoopNotifier, Timestamp,
    SECONDS_PER_MONTH,
};
use kledger_engine::{LedgerConfig, LedgerService, RateModel};
use std::sync::Arc;
use std::time::Duration;

const WEI: u128 = 1_000_000_000_000_000_000;

fn service() -> (LedgerService, Arc<InMemoryTokenService>) {
    let tokens = Arc::new(InMemoryTokenService::without_allowances("klender".into()));
    let service = LedgerService::new(
        LedgerConfig::default(),
        tokens.clone(),
        Arc::new(ManualClock::new(Timestamp::from_secs(1_700_000_000))),
        Arc::new(NoopNotifier),
    )
    .unwrap();
    tokens
        .fund_custody(&AssetId::from("USDT"), Amount::new(u64::MAX as u128 * WEI))
        .unwrap();
    (service, tokens)
}

// ============ RATE MODEL BENCHMARKS ============

fn bench_rate_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("rate_model");
    let model = RateModel::default();

    for whole in [1u128, 1_000, 1_000_000_000] {
        let amount = Amount::new(whole * WEI);

        group.bench_with_input(
            BenchmarkId::new("principal_preview", whole),
            &amount,
            |b, amount| b.iter(|| model.simulate_from_principal_asset(black_box(*amount))),
        );
        group.bench_with_input(
            BenchmarkId::new("collateral_preview", whole),
            &amount,
            |b, amount| b.iter(|| model.simulate_from_collateral_asset(black_box(*amount))),
        );
    }

    group.bench_function("stake_interest", |b| {
        b.iter(|| {
            model.monthly_stake_interest(
                black_box(Amount::new(100 * WEI)),
                black_box(SECONDS_PER_MONTH),
            )
        })
    });

    group.finish();
}

// ============ LEDGER BENCHMARKS ============

fn bench_loan_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("loan_cycle");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(1));

    let rt = tokio::runtime::Runtime::new().unwrap();
    let (service, tokens) = service();
    let flym = AssetId::from("FLYM");
    let usdt = AssetId::from("USDT");
    let borrower = AccountId::from("borrower");
    let controller = AccountId::from("controller");

    group.bench_function("request_approve_repay", |b| {
        b.iter(|| {
            rt.block_on(async {
                tokens.mint(&flym, &borrower, Amount::new(5 * WEI)).unwrap();
                tokens.mint(&usdt, &borrower, Amount::new(158 * WEI)).unwrap();

                let loans = service.loan_ledger();
                loans
                    .request_borrow(&borrower, black_box(Amount::new(100 * WEI)))
                    .await
                    .unwrap();
                loans.approve_borrow(&controller, &borrower).await.unwrap();
                loans.repay(&borrower).await.unwrap()
            })
        })
    });

    group.finish();
}

fn bench_stake_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("stake_cycle");
    group.throughput(Throughput::Elements(1));

    let rt = tokio::runtime::Runtime::new().unwrap();
    let (service, tokens) = service();
    let usdt = AssetId::from("USDT");
    let investor = AccountId::from("investor");

    group.bench_function("stake_get_unstake", |b| {
        b.iter(|| {
            rt.block_on(async {
                tokens.mint(&usdt, &investor, Amount::new(100 * WEI)).unwrap();

                let stakes = service.stake_ledger();
                stakes
                    .stake(&investor, black_box(Amount::new(100 * WEI)))
                    .await
                    .unwrap();
                stakes.get_stake(&investor).await.unwrap();
                stakes.unstake(&investor).await.unwrap()
            })
        })
    });

    group.finish();
}

criterion_group!(
    name = rate_benches;
    config = Criterion::default().sample_size(200);
    targets = bench_rate_model
);

criterion_group!(
    name = ledger_benches;
    config = Criterion::default().sample_size(100);
    targets = bench_loan_cycle, bench_stake_cycle
);

criterion_main!(rate_benches, ledger_benches);
