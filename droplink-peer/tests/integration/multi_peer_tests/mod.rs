mod test_bad_answer_scopes_to_one_session;
