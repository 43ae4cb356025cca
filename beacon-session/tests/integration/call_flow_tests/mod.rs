mod test_end_call_teardown;
mod test_spectator_invite;
mod test_two_party_call;
