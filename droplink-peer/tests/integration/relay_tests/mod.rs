mod test_store_outage_is_retried;
