pub mod box_pair_tester;
