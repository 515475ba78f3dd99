mod middleware_tests;
