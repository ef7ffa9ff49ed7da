//! Command wiring
//!
//! Builds the Postgres-backed services for one command and runs it. The
//! gateway is the deterministic sandbox; payment creation is serialized
//! per account through the table-backed subject lock so concurrent CLI
//! runs do not double-charge.

use std::sync::Arc;
use tracing::info;

use domain_payments::adapters::SandboxGateway;
use domain_payments::{
    Gateway, PaymentProcessor, PaymentService, RefundService, RefundSummary, SubjectLockProvider,
};
use domain_scheduling::{
    InitialServiceCompletedHandler, PaymentSubmitter, TriggerPipeline, TriggerRunSummary,
};
use infra_db::{
    create_pool, run_migrations, DatabaseConfig, DatabasePool, PgPaymentMethodRepository,
    PgPaymentRepository, PgScheduledPaymentRepository, PgSubjectLockProvider,
    PgSubscriptionLookup, PgTransactionRepository,
};

use crate::args::{RefundAllByIdArgs, RunScheduledArgs};
use crate::config::CliConfig;
use crate::error::CliError;

/// Connects to the database and applies pending migrations
pub async fn connect(config: &CliConfig) -> Result<DatabasePool, CliError> {
    let db_config = DatabaseConfig::new(config.database_url.clone())
        .max_connections(config.max_connections)
        .min_connections(config.max_connections.min(2));
    let pool = create_pool(db_config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

fn processor(pool: &DatabasePool) -> PaymentProcessor {
    let gateway: Arc<dyn Gateway> = Arc::new(SandboxGateway::new());
    PaymentProcessor::new(Arc::new(PgTransactionRepository::new(pool.clone()))).with_gateway(gateway)
}

pub async fn refund_all_by_id(
    pool: &DatabasePool,
    config: &CliConfig,
    args: &RefundAllByIdArgs,
) -> Result<RefundSummary, CliError> {
    info!(
        payments = args.payment_ids.len(),
        days_allowed = ?args.days_allowed,
        fake_external_ref = args.fake_external_ref,
        "Starting batch refund"
    );
    let refunds = RefundService::new(
        Arc::new(PgPaymentRepository::new(pool.clone())),
        processor(pool),
        Arc::new(PgSubjectLockProvider::new(pool.clone())),
        config.payments.clone(),
    );
    Ok(refunds.refund_all_by_id(&args.payment_ids, args.options()).await?)
}

pub async fn run_scheduled(
    pool: &DatabasePool,
    config: &CliConfig,
    args: &RunScheduledArgs,
) -> Result<TriggerRunSummary, CliError> {
    info!(area = %args.area, page_size = config.scheduling.page_size, "Starting scheduled payment run");
    let locks: Arc<dyn SubjectLockProvider> = Arc::new(PgSubjectLockProvider::new(pool.clone()));
    let payments: Arc<dyn PaymentSubmitter> = Arc::new(PaymentService::new(
        Arc::new(PgPaymentRepository::new(pool.clone())),
        Arc::new(PgPaymentMethodRepository::new(pool.clone())),
        processor(pool),
        locks,
        config.payments.clone(),
    ));
    let handler = InitialServiceCompletedHandler::new(
        Arc::new(PgSubscriptionLookup::new(pool.clone())),
        payments,
    );
    let pipeline = TriggerPipeline::new(
        Arc::new(PgScheduledPaymentRepository::new(pool.clone())),
        handler,
        config.scheduling.clone(),
    )?;
    Ok(pipeline.run(&args.area).await?)
}
