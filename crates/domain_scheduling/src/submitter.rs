//! `PaymentSubmitter` backed by the payment service

use async_trait::async_trait;

use domain_payments::{CreatePaymentOutcome, CreatePaymentRequest, PaymentError, PaymentService};

use crate::ports::PaymentSubmitter;

#[async_trait]
impl PaymentSubmitter for PaymentService {
    async fn submit_batch_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<CreatePaymentOutcome, PaymentError> {
        self.create_payment(request.batch()).await
    }
}
