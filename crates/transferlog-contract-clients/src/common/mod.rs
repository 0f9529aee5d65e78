pub(crate) mod tx_submitter;
