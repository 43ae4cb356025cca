mod test_announcer;
