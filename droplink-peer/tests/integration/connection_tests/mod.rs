mod test_join_triggers_offer;
