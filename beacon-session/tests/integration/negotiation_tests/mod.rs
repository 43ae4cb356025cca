mod test_candidate_buffering;
mod test_concurrent_offers;
mod test_duplicate_answer;
