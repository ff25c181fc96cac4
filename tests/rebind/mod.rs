mod rebind_cycle;
